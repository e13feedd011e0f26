//! Password hashing via bcrypt, fixed cost factor 12.

use crate::errors::AppError;

const BCRYPT_COST: u32 = 12;

/// Hash a password. Only resource exhaustion can fail this in practice.
pub fn hash(password: &str) -> Result<String, AppError> {
    bcrypt::hash(password, BCRYPT_COST)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("bcrypt hash failed: {}", e)))
}

/// Verify a candidate against a stored hash. Mismatch and malformed hashes
/// both return false; this never errors toward the caller.
pub fn verify(stored_hash: &str, candidate: &str) -> bool {
    bcrypt::verify(candidate, stored_hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_verifies() {
        let h = hash("Strong1!pass").unwrap();
        assert!(verify(&h, "Strong1!pass"));
    }

    #[test]
    fn wrong_candidate_fails() {
        let h = hash("Strong1!pass").unwrap();
        assert!(!verify(&h, "Strong1!passx"));
    }

    #[test]
    fn malformed_hash_returns_false() {
        assert!(!verify("not-a-bcrypt-hash", "whatever"));
    }
}
