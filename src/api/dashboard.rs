//! Dashboard stats endpoint backing the frontend home view.

use std::sync::Arc;

use axum::extract::State;
use axum::{Extension, Json};

use crate::auth::middleware::AuthUser;
use crate::errors::AppError;
use crate::store::postgres::DashboardStats;
use crate::AppState;

/// GET /api/dashboard/stats
pub async fn stats(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
) -> Result<Json<DashboardStats>, AppError> {
    Ok(Json(state.db.dashboard_stats().await?))
}
