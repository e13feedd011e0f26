use std::sync::Arc;

use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::auth::middleware::require_auth;
use crate::AppState;

pub mod dashboard;
pub mod handlers;

/// Build the API router. All routes are relative — the caller mounts this
/// under `/api`.
pub fn api_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let public = Router::new()
        .route("/auth/register", post(auth::handlers::register))
        .route("/auth/login", post(auth::handlers::login))
        .route("/auth/refresh", post(auth::handlers::refresh));

    let protected = Router::new()
        .route(
            "/stores",
            get(handlers::list_stores).post(handlers::create_store),
        )
        .route(
            "/stores/:id",
            get(handlers::get_store).delete(handlers::delete_store),
        )
        .route(
            "/shelves",
            get(handlers::list_shelves).post(handlers::create_shelf),
        )
        .route("/shelves/:id", delete(handlers::delete_shelf))
        .route(
            "/products",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route(
            "/products/:id",
            get(handlers::get_product).delete(handlers::delete_product),
        )
        .route("/products/:id/image", post(handlers::upload_product_image))
        .route(
            "/staff",
            get(handlers::list_staff).post(handlers::create_staff),
        )
        .route("/staff/:id", delete(handlers::delete_staff))
        .route(
            "/placements",
            get(handlers::list_placements).put(handlers::upsert_placement),
        )
        .route(
            "/restock-tasks",
            get(handlers::list_restock_tasks).post(handlers::create_restock_task),
        )
        .route(
            "/restock-tasks/:id/complete",
            post(handlers::complete_restock_task),
        )
        .route(
            "/stock-requests",
            get(handlers::list_stock_requests).post(handlers::create_stock_request),
        )
        .route(
            "/stock-requests/:id/decision",
            post(handlers::decide_stock_request),
        )
        .route("/sales", post(handlers::record_sale))
        .route("/alerts", get(handlers::list_alerts))
        .route("/dashboard/stats", get(dashboard::stats))
        .layer(middleware::from_fn_with_state(state, require_auth));

    public
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .fallback(fallback_404)
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}
