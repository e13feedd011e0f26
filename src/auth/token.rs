//! Access / refresh token issuance and validation.
//!
//! Access tokens are HS256 JWTs carrying subject, display name, store id and
//! role claims. Refresh tokens are opaque 64-byte random values, base64-encoded,
//! persisted on the user row (one active value per user).

use base64::Engine;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

/// Claim set embedded in every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's email.
    pub sub: String,
    /// Fresh random token id per issuance.
    pub jti: String,
    /// Display name.
    pub name: String,
    /// Associated store id; empty string sentinel when the user has none.
    pub store_id: String,
    /// One role claim per role.
    pub roles: Vec<String>,
    pub iss: String,
    pub aud: String,
    /// Expiry (Unix timestamp).
    pub exp: i64,
    /// Issued at (Unix timestamp).
    pub iat: i64,
}

impl Claims {
    pub fn store_id_as_int(&self) -> Option<i32> {
        if self.store_id.is_empty() {
            None
        } else {
            self.store_id.parse().ok()
        }
    }
}

/// Stateless token construction and validation. Never touches persistence.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    access_minutes: i64,
}

impl TokenService {
    pub fn new(secret: &str, issuer: &str, audience: &str, access_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            access_minutes,
        }
    }

    /// Build and sign an access token for the given identity.
    pub fn issue_access_token(
        &self,
        email: &str,
        name: &str,
        store_id: Option<i32>,
        roles: &[String],
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: email.to_string(),
            jti: Uuid::new_v4().to_string(),
            name: name.to_string(),
            store_id: store_id.map(|s| s.to_string()).unwrap_or_default(),
            roles: roles.to_vec(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp: (now + Duration::minutes(self.access_minutes)).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("token signing failed: {}", e)))
    }

    /// Draw a fresh opaque refresh token: 64 random bytes, base64-encoded.
    /// Collision probability in a 512-bit space is treated as negligible;
    /// no uniqueness check is performed.
    pub fn issue_refresh_token(&self) -> String {
        let mut bytes = [0u8; 64];
        OsRng.fill_bytes(&mut bytes);
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    /// Validate an access token fully (signature, issuer, audience, expiry).
    /// Used by the request-auth middleware.
    pub fn decode_access_token(&self, token: &str) -> Result<Claims, AppError> {
        let validation = self.base_validation(true);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::Authentication)
    }

    /// Decode an expired-but-otherwise-valid access token for the refresh
    /// exchange. Signature, issuer, audience and algorithm are all enforced;
    /// expiry deliberately is not — the refresh endpoint is the one caller
    /// allowed to present an expired token.
    pub fn principal_from_expired_token(&self, token: &str) -> Result<Claims, AppError> {
        let validation = self.base_validation(false);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::Authentication)
    }

    fn base_validation(&self, validate_exp: bool) -> Validation {
        // Pinning the algorithm list to HS256 rejects tokens signed with any
        // other algorithm, including `none`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.validate_exp = validate_exp;
        validation
    }

    pub fn access_minutes(&self) -> i64 {
        self.access_minutes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret", "shelfsense", "shelfsense-dashboard", 15)
    }

    #[test]
    fn issued_token_reproduces_claims() {
        let svc = service();
        let roles = vec!["manager".to_string(), "staff".to_string()];
        let before = Utc::now().timestamp();
        let token = svc
            .issue_access_token("ana@example.com", "Ana", Some(7), &roles)
            .unwrap();
        let claims = svc.decode_access_token(&token).unwrap();

        assert_eq!(claims.sub, "ana@example.com");
        assert_eq!(claims.name, "Ana");
        assert_eq!(claims.store_id, "7");
        assert_eq!(claims.store_id_as_int(), Some(7));
        assert_eq!(claims.roles, roles);
        assert_eq!(claims.iss, "shelfsense");
        assert_eq!(claims.aud, "shelfsense-dashboard");
        // expiry = issuance + configured window
        assert!(claims.exp >= before + 15 * 60);
        assert!(claims.exp <= claims.iat + 15 * 60);
    }

    #[test]
    fn missing_store_id_uses_empty_sentinel() {
        let svc = service();
        let token = svc
            .issue_access_token("bo@example.com", "Bo", None, &["staff".to_string()])
            .unwrap();
        let claims = svc.decode_access_token(&token).unwrap();
        assert_eq!(claims.store_id, "");
        assert_eq!(claims.store_id_as_int(), None);
    }

    #[test]
    fn fresh_jti_per_call() {
        let svc = service();
        let t1 = svc
            .issue_access_token("a@x.com", "A", None, &["staff".into()])
            .unwrap();
        let t2 = svc
            .issue_access_token("a@x.com", "A", None, &["staff".into()])
            .unwrap();
        let c1 = svc.decode_access_token(&t1).unwrap();
        let c2 = svc.decode_access_token(&t2).unwrap();
        assert_ne!(c1.jti, c2.jti);
    }

    #[test]
    fn refresh_token_is_64_random_bytes() {
        let svc = service();
        let t1 = svc.issue_refresh_token();
        let t2 = svc.issue_refresh_token();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&t1)
            .unwrap();
        assert_eq!(decoded.len(), 64);
        assert_ne!(t1, t2);
    }

    fn expired_token() -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: "old@example.com".into(),
            jti: Uuid::new_v4().to_string(),
            name: "Old".into(),
            store_id: String::new(),
            roles: vec!["staff".into()],
            iss: "shelfsense".into(),
            aud: "shelfsense-dashboard".into(),
            exp: (now - Duration::hours(2)).timestamp(),
            iat: (now - Duration::hours(3)).timestamp(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap()
    }

    #[test]
    fn expired_token_rejected_by_access_validation() {
        let svc = service();
        let token = expired_token();
        assert!(svc.decode_access_token(&token).is_err());
    }

    #[test]
    fn expired_token_accepted_by_refresh_decode() {
        let svc = service();
        let token = expired_token();
        let claims = svc.principal_from_expired_token(&token).unwrap();
        assert_eq!(claims.sub, "old@example.com");
    }

    #[test]
    fn wrong_key_rejected_even_for_refresh_decode() {
        let svc = service();
        let other = TokenService::new("other-secret", "shelfsense", "shelfsense-dashboard", 15);
        let token = other
            .issue_access_token("x@x.com", "X", None, &["staff".into()])
            .unwrap();
        assert!(svc.principal_from_expired_token(&token).is_err());
    }

    #[test]
    fn wrong_issuer_or_audience_rejected() {
        let svc = service();
        let wrong_iss =
            TokenService::new("test-secret", "someone-else", "shelfsense-dashboard", 15);
        let token = wrong_iss
            .issue_access_token("x@x.com", "X", None, &["staff".into()])
            .unwrap();
        assert!(svc.principal_from_expired_token(&token).is_err());

        let wrong_aud = TokenService::new("test-secret", "shelfsense", "other-app", 15);
        let token = wrong_aud
            .issue_access_token("x@x.com", "X", None, &["staff".into()])
            .unwrap();
        assert!(svc.principal_from_expired_token(&token).is_err());
    }

    #[test]
    fn wrong_algorithm_rejected() {
        let svc = service();
        let now = Utc::now();
        let claims = Claims {
            sub: "x@x.com".into(),
            jti: Uuid::new_v4().to_string(),
            name: "X".into(),
            store_id: String::new(),
            roles: vec!["staff".into()],
            iss: "shelfsense".into(),
            aud: "shelfsense-dashboard".into(),
            exp: (now + Duration::hours(1)).timestamp(),
            iat: now.timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert!(svc.principal_from_expired_token(&token).is_err());
        assert!(svc.decode_access_token(&token).is_err());
    }
}
