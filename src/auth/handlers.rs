//! Registration, login and refresh-exchange handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;

use crate::auth::{password, validate};
use crate::errors::AppError;
use crate::models::user::{NewUser, UserSummary};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in_minutes: i64,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserSummary>), AppError> {
    let errors = validate::validate_registration(
        &payload.name,
        &payload.email,
        &payload.password,
        &payload.role,
    );
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let password_hash = password::hash(&payload.password)?;
    let user = state
        .db
        .insert_user(&NewUser {
            name: payload.name,
            email: payload.email.to_lowercase(),
            phone: payload.phone,
            password_hash,
            role: payload.role,
            store_id: None,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenPairResponse>, AppError> {
    let user = state
        .db
        .find_user_by_email(&payload.email.to_lowercase())
        .await?
        .ok_or(AppError::Authentication)?;

    if !password::verify(&user.password_hash, &payload.password) {
        return Err(AppError::Authentication);
    }

    let pair = issue_pair(&state, &user.email, &user.name, user.store_id, &user.role).await?;
    state
        .db
        .update_refresh_token(
            user.id,
            &pair.refresh_token,
            Utc::now() + Duration::days(state.config.refresh_token_days),
        )
        .await?;

    tracing::info!(user = %user.email, "login succeeded");
    Ok(Json(pair))
}

/// POST /api/auth/refresh
///
/// Requires an expired-but-valid access token plus the currently stored
/// refresh token. Exchanges are serialized per user so concurrent refreshes
/// cannot lose the stored-token update.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenPairResponse>, AppError> {
    let claims = state
        .tokens
        .principal_from_expired_token(&payload.access_token)?;

    let lock = state
        .refresh_locks
        .entry(claims.sub.clone())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone();
    let _guard = lock.lock().await;

    let user = state
        .db
        .find_user_by_email(&claims.sub)
        .await?
        .ok_or(AppError::Authentication)?;

    if let Err(e) = validate_stored_refresh(
        user.refresh_token.as_deref(),
        user.refresh_token_expires_at,
        &payload.refresh_token,
    ) {
        tracing::warn!(user = %user.email, "refresh exchange with stale or unknown token");
        return Err(e);
    }

    let pair = issue_pair(&state, &user.email, &user.name, user.store_id, &user.role).await?;
    state
        .db
        .update_refresh_token(
            user.id,
            &pair.refresh_token,
            Utc::now() + Duration::days(state.config.refresh_token_days),
        )
        .await?;

    drop(_guard);
    release_refresh_lock(&state.refresh_locks, &claims.sub, lock);

    Ok(Json(pair))
}

/// Decide whether a presented refresh token may be exchanged: it must match
/// the single stored value (constant-time compare) and the stored expiry
/// must not have passed. Any failure means the client re-authenticates.
pub fn validate_stored_refresh(
    stored: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
    presented: &str,
) -> Result<(), AppError> {
    let stored = stored.ok_or(AppError::Authentication)?;
    if stored.as_bytes().ct_eq(presented.as_bytes()).unwrap_u8() != 1 {
        return Err(AppError::Authentication);
    }
    let expires_at = expires_at.ok_or(AppError::Authentication)?;
    if expires_at < Utc::now() {
        return Err(AppError::Authentication);
    }
    Ok(())
}

/// Drop our handle on a per-user refresh lock and reap the map entry when no
/// concurrent exchange still holds a clone, keeping the map bounded by
/// in-flight users rather than every subject that ever refreshed.
fn release_refresh_lock(
    locks: &DashMap<String, Arc<Mutex<()>>>,
    subject: &str,
    lock: Arc<Mutex<()>>,
) {
    drop(lock);
    locks.remove_if(subject, |_, l| Arc::strong_count(l) == 1);
}

async fn issue_pair(
    state: &AppState,
    email: &str,
    name: &str,
    store_id: Option<i32>,
    role: &str,
) -> Result<TokenPairResponse, AppError> {
    let access_token =
        state
            .tokens
            .issue_access_token(email, name, store_id, &[role.to_string()])?;
    Ok(TokenPairResponse {
        access_token,
        refresh_token: state.tokens.issue_refresh_token(),
        token_type: "Bearer",
        expires_in_minutes: state.tokens.access_minutes(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_a_week() -> Option<DateTime<Utc>> {
        Some(Utc::now() + Duration::days(7))
    }

    #[test]
    fn matching_token_within_expiry_is_accepted() {
        assert!(validate_stored_refresh(Some("tok-current"), in_a_week(), "tok-current").is_ok());
    }

    #[test]
    fn rotated_out_token_is_rejected() {
        // A client replaying the previous token after rotation gets a 401.
        let result = validate_stored_refresh(Some("tok-new"), in_a_week(), "tok-old");
        assert!(matches!(result, Err(AppError::Authentication)));
    }

    #[test]
    fn user_without_stored_token_is_rejected() {
        let result = validate_stored_refresh(None, in_a_week(), "tok-any");
        assert!(matches!(result, Err(AppError::Authentication)));
    }

    #[test]
    fn expired_stored_token_is_rejected() {
        let past = Some(Utc::now() - Duration::minutes(1));
        let result = validate_stored_refresh(Some("tok-current"), past, "tok-current");
        assert!(matches!(result, Err(AppError::Authentication)));
    }

    #[test]
    fn stored_token_without_expiry_is_rejected() {
        let result = validate_stored_refresh(Some("tok-current"), None, "tok-current");
        assert!(matches!(result, Err(AppError::Authentication)));
    }

    #[tokio::test]
    async fn lock_entry_is_reaped_after_sole_exchange() {
        let locks: DashMap<String, Arc<Mutex<()>>> = DashMap::new();
        let lock = locks
            .entry("dana@store7.example.com".to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        drop(lock.lock().await);
        release_refresh_lock(&locks, "dana@store7.example.com", lock);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn lock_entry_survives_while_another_exchange_holds_it() {
        let locks: DashMap<String, Arc<Mutex<()>>> = DashMap::new();
        let lock = locks
            .entry("dana@store7.example.com".to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let concurrent = lock.clone();
        release_refresh_lock(&locks, "dana@store7.example.com", lock);
        assert!(locks.contains_key("dana@store7.example.com"));
        drop(concurrent);
    }
}
