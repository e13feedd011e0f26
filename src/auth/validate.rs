//! Registration payload validation.
//!
//! Failures surface as a 400 with field-level messages; they are never logged
//! as server errors.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::FieldError;
use crate::models::user::is_known_role;

static HAS_LOWER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z]").unwrap());
static HAS_UPPER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z]").unwrap());
static HAS_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]").unwrap());
static HAS_SPECIAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9]").unwrap());
static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// Password policy: min 8 chars, at least one lower, upper, digit and
/// special character.
pub fn validate_password(password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if password.len() < 8 {
        errors.push(FieldError::new(
            "password",
            "must be at least 8 characters",
        ));
    }
    if !HAS_LOWER.is_match(password) {
        errors.push(FieldError::new(
            "password",
            "must contain a lowercase letter",
        ));
    }
    if !HAS_UPPER.is_match(password) {
        errors.push(FieldError::new(
            "password",
            "must contain an uppercase letter",
        ));
    }
    if !HAS_DIGIT.is_match(password) {
        errors.push(FieldError::new("password", "must contain a digit"));
    }
    if !HAS_SPECIAL.is_match(password) {
        errors.push(FieldError::new(
            "password",
            "must contain a special character",
        ));
    }
    errors
}

pub fn validate_registration(
    name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if name.trim().is_empty() {
        errors.push(FieldError::new("name", "must not be empty"));
    }
    if !EMAIL.is_match(email) {
        errors.push(FieldError::new("email", "invalid email address"));
    }
    errors.extend(validate_password(password));
    if !is_known_role(role) {
        errors.push(FieldError::new("role", "unknown role"));
    }
    errors
}
