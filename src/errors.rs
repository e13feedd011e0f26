use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Fixed body returned on 401 responses. Clients key on this exact message.
pub const AUTHENTICATION_REQUIRED: &str =
    "Authentication required. Please log in to access this resource.";

/// Fixed body returned on 403 responses.
pub const ACCESS_DENIED: &str =
    "Access denied. You do not have permission to perform this action.";

/// A single field-level validation failure, surfaced in 400 responses.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("authentication failed")]
    Authentication,

    #[error("authorization failed")]
    Authorization,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage not configured")]
    StorageNotConfigured,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
            }
            AppError::Authentication => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": AUTHENTICATION_REQUIRED })),
            )
                .into_response(),
            AppError::Authorization => (
                StatusCode::FORBIDDEN,
                Json(json!({ "message": ACCESS_DENIED })),
            )
                .into_response(),
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": format!("{} not found", what) })),
            )
                .into_response(),
            AppError::Conflict(msg) => {
                (StatusCode::CONFLICT, Json(json!({ "message": msg }))).into_response()
            }
            AppError::StorageNotConfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "message": "image storage is not configured" })),
            )
                .into_response(),
            AppError::Transport(msg) => {
                tracing::error!("transport error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "message": "upstream delivery failed" })),
                )
                    .into_response()
            }
            AppError::Database(e) => {
                tracing::error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "internal server error" })),
                )
                    .into_response()
            }
            AppError::Internal(e) => {
                tracing::error!("internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn authentication_error_uses_fixed_message() {
        let resp = AppError::Authentication.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(resp).await;
        assert_eq!(body["message"], AUTHENTICATION_REQUIRED);
    }

    #[tokio::test]
    async fn authorization_error_uses_fixed_message() {
        let resp = AppError::Authorization.into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body = body_json(resp).await;
        assert_eq!(body["message"], ACCESS_DENIED);
    }

    #[tokio::test]
    async fn validation_error_lists_fields() {
        let resp = AppError::Validation(vec![
            FieldError::new("password", "must be at least 8 characters"),
            FieldError::new("email", "invalid email address"),
        ])
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["errors"].as_array().unwrap().len(), 2);
        assert_eq!(body["errors"][0]["field"], "password");
    }

    #[tokio::test]
    async fn internal_error_leaks_no_detail() {
        let resp = AppError::Internal(anyhow::anyhow!("secret detail")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(body["message"], "internal server error");
    }
}
