use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role labels recognized by the authorization layer.
/// Matches the `role` column on `users`.
pub const ROLE_MANAGER: &str = "manager";
pub const ROLE_STAFF: &str = "staff";

pub fn is_known_role(role: &str) -> bool {
    matches!(role, ROLE_MANAGER | ROLE_STAFF)
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: String,
    pub store_id: Option<i32>,
    pub refresh_token: Option<String>,
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: String,
    pub store_id: Option<i32>,
}

/// Public projection of a user — never carries the hash or refresh token.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub store_id: Option<i32>,
}

impl From<User> for UserSummary {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
            store_id: u.store_id,
        }
    }
}
