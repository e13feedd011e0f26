//! Request authentication middleware and the claims-based identity it produces.

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::errors::AppError;
use crate::AppState;

/// Identity extracted from a validated access token, attached to the request
/// as an extension. Claims are not re-checked against live state after
/// issuance; that staleness window is accepted.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub subject: String,
    pub name: String,
    pub roles: HashSet<String>,
    pub store_id: Option<i32>,
}

impl AuthUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// 403 with the fixed access-denied body when the role claim is absent.
    pub fn require_role(&self, role: &str) -> Result<(), AppError> {
        if self.has_role(role) {
            Ok(())
        } else {
            tracing::warn!(subject = %self.subject, required = role, "authorization denied");
            Err(AppError::Authorization)
        }
    }
}

/// Middleware: validates the bearer token and attaches [`AuthUser`].
/// Missing or invalid credentials map to the fixed 401 body.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(AppError::Authentication)?;

    let claims = state.tokens.decode_access_token(token)?;

    let user = AuthUser {
        store_id: claims.store_id_as_int(),
        subject: claims.sub,
        name: claims.name,
        roles: claims.roles.into_iter().collect(),
    };

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staff_user() -> AuthUser {
        AuthUser {
            subject: "staff@example.com".into(),
            name: "Staff".into(),
            roles: ["staff".to_string()].into_iter().collect(),
            store_id: Some(1),
        }
    }

    #[test]
    fn role_check_passes_for_held_role() {
        assert!(staff_user().require_role("staff").is_ok());
    }

    #[test]
    fn role_check_denies_missing_role() {
        let err = staff_user().require_role("manager").unwrap_err();
        assert!(matches!(err, AppError::Authorization));
    }
}
