//! Integration tests for the token issuance / refresh-exchange logic and
//! the registration validation rules.
//!
//! These exercise the library crate without a database: token construction
//! and validation are pure, and the password/validation layers are
//! self-contained.

use shelfsense::auth::token::TokenService;
use shelfsense::auth::{password, validate};

fn service() -> TokenService {
    TokenService::new("integration-secret", "shelfsense", "shelfsense-dashboard", 15)
}

mod token_pair {
    use super::*;

    #[test]
    fn login_shaped_issuance_round_trips_claims() {
        let svc = service();
        let access = svc
            .issue_access_token(
                "manager@store7.example.com",
                "Dana",
                Some(7),
                &["manager".to_string()],
            )
            .unwrap();
        let refresh = svc.issue_refresh_token();

        let claims = svc.decode_access_token(&access).unwrap();
        assert_eq!(claims.sub, "manager@store7.example.com");
        assert_eq!(claims.roles, vec!["manager".to_string()]);
        assert_eq!(claims.store_id_as_int(), Some(7));

        // opaque refresh token: base64 of 64 bytes is 88 chars with padding
        assert_eq!(refresh.len(), 88);
    }

    #[test]
    fn tokens_from_a_different_service_key_are_rejected() {
        let svc = service();
        let rogue = TokenService::new("rogue-secret", "shelfsense", "shelfsense-dashboard", 15);
        let forged = rogue
            .issue_access_token("victim@example.com", "V", None, &["manager".into()])
            .unwrap();
        assert!(svc.decode_access_token(&forged).is_err());
        assert!(svc.principal_from_expired_token(&forged).is_err());
    }

    #[test]
    fn refresh_decode_ignores_expiry_but_nothing_else() {
        // A freshly issued (non-expired) token also passes the refresh-path
        // decode; only signature/issuer/audience/algorithm are enforced there.
        let svc = service();
        let access = svc
            .issue_access_token("a@b.com", "A", None, &["staff".into()])
            .unwrap();
        assert!(svc.principal_from_expired_token(&access).is_ok());
    }
}

mod refresh_exchange {
    use super::*;
    use chrono::{Duration, Utc};
    use shelfsense::auth::handlers::validate_stored_refresh;

    #[test]
    fn only_the_currently_stored_token_exchanges() {
        let svc = service();
        let current = svc.issue_refresh_token();
        let rotated_out = svc.issue_refresh_token();
        let expiry = Some(Utc::now() + Duration::days(7));

        assert!(validate_stored_refresh(Some(&current), expiry, &current).is_ok());
        // After rotation the old token must fail even though it was once valid.
        assert!(validate_stored_refresh(Some(&current), expiry, &rotated_out).is_err());
    }

    #[test]
    fn lapsed_refresh_window_forces_relogin() {
        let svc = service();
        let current = svc.issue_refresh_token();
        let lapsed = Some(Utc::now() - Duration::days(1));
        assert!(validate_stored_refresh(Some(&current), lapsed, &current).is_err());
    }

    #[test]
    fn logged_out_user_has_nothing_to_exchange() {
        let expiry = Some(Utc::now() + Duration::days(7));
        assert!(validate_stored_refresh(None, expiry, "anything").is_err());
    }
}

mod credentials {
    use super::*;

    #[test]
    fn hash_verify_round_trip() {
        let h = password::hash("Strong1!").unwrap();
        assert!(password::verify(&h, "Strong1!"));
        assert!(!password::verify(&h, "Strong1!x"));
    }

    #[test]
    fn two_hashes_of_same_password_differ() {
        let h1 = password::hash("Strong1!").unwrap();
        let h2 = password::hash("Strong1!").unwrap();
        assert_ne!(h1, h2); // salted
        assert!(password::verify(&h2, "Strong1!"));
    }
}

mod registration_rules {
    use super::*;

    #[test]
    fn weak1_is_rejected_for_length() {
        let errors = validate::validate_registration("Pat", "pat@example.com", "Weak1", "staff");
        assert!(errors.iter().any(|e| e.field == "password"));
    }

    #[test]
    fn strong1_bang_is_accepted() {
        let errors =
            validate::validate_registration("Pat", "pat@example.com", "Strong1!", "staff");
        assert!(errors.is_empty());
    }

    #[test]
    fn unknown_role_is_rejected() {
        let errors =
            validate::validate_registration("Pat", "pat@example.com", "Strong1!", "wizard");
        assert!(errors.iter().any(|e| e.field == "role"));
    }
}

mod fixed_messages {
    use shelfsense::errors::{ACCESS_DENIED, AUTHENTICATION_REQUIRED};

    #[test]
    fn bodies_are_byte_exact() {
        assert_eq!(
            AUTHENTICATION_REQUIRED,
            "Authentication required. Please log in to access this resource."
        );
        assert_eq!(
            ACCESS_DENIED,
            "Access denied. You do not have permission to perform this action."
        );
    }
}
