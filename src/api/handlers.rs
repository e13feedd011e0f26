//! CRUD handlers for the inventory surface.
//!
//! Role policy: mutating inventory endpoints require the `manager` role;
//! reads are open to any authenticated role; stock requests may be created
//! by `staff` or `manager`.

use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::auth::middleware::AuthUser;
use crate::errors::{AppError, FieldError};
use crate::models::alert::ReplenishmentAlert;
use crate::models::inventory::{
    Product, ProductShelf, RestockTask, SalesRecord, Shelf, Staff, StockRequest, Store,
};
use uuid::Uuid;
use crate::models::user::ROLE_MANAGER;
use crate::AppState;

// ── Request DTOs ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateStoreRequest {
    pub name: String,
    pub location: Option<String>,
    pub manager_email: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateShelfRequest {
    pub store_id: i32,
    pub label: String,
    pub aisle: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub sku: String,
    pub category: Option<String>,
    pub unit_price: f64,
}

#[derive(Deserialize)]
pub struct UpsertPlacementRequest {
    pub product_id: i32,
    pub shelf_id: i32,
    pub quantity: i32,
    pub restock_threshold: i32,
}

#[derive(Deserialize)]
pub struct CreateRestockTaskRequest {
    pub product_id: i32,
    pub shelf_id: i32,
    pub quantity: i32,
    pub assigned_to: Option<i32>,
}

#[derive(Deserialize)]
pub struct CreateStockRequestRequest {
    pub product_id: i32,
    pub store_id: i32,
    pub quantity: i32,
}

#[derive(Deserialize)]
pub struct DecisionRequest {
    pub decision: String, // "approved" | "rejected"
}

#[derive(Deserialize)]
pub struct RecordSaleRequest {
    pub product_id: i32,
    pub store_id: i32,
    pub units_sold: i32,
    pub sale_date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct StoreFilter {
    pub store_id: Option<i32>,
}

#[derive(Deserialize)]
pub struct ShelfFilter {
    pub shelf_id: Option<i32>,
}

#[derive(Deserialize)]
pub struct StatusFilter {
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct AlertQuery {
    pub limit: Option<i64>,
}

// ── Store handlers ───────────────────────────────────────────

pub async fn list_stores(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
) -> Result<Json<Vec<Store>>, AppError> {
    Ok(Json(state.db.list_stores().await?))
}

pub async fn create_store(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateStoreRequest>,
) -> Result<(StatusCode, Json<Store>), AppError> {
    user.require_role(ROLE_MANAGER)?;
    let store = state
        .db
        .create_store(
            &payload.name,
            payload.location.as_deref(),
            payload.manager_email.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(store)))
}

pub async fn get_store(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<Json<Store>, AppError> {
    state
        .db
        .get_store(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("store"))
}

pub async fn delete_store(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    user.require_role(ROLE_MANAGER)?;
    if state.db.delete_store(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("store"))
    }
}

// ── Shelf handlers ───────────────────────────────────────────

pub async fn list_shelves(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
    Query(filter): Query<StoreFilter>,
) -> Result<Json<Vec<Shelf>>, AppError> {
    Ok(Json(state.db.list_shelves(filter.store_id).await?))
}

pub async fn create_shelf(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateShelfRequest>,
) -> Result<(StatusCode, Json<Shelf>), AppError> {
    user.require_role(ROLE_MANAGER)?;
    let shelf = state
        .db
        .create_shelf(payload.store_id, &payload.label, payload.aisle.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(shelf)))
}

pub async fn delete_shelf(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    user.require_role(ROLE_MANAGER)?;
    if state.db.delete_shelf(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("shelf"))
    }
}

// ── Product handlers ─────────────────────────────────────────

pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(state.db.list_products().await?))
}

pub async fn create_product(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    user.require_role(ROLE_MANAGER)?;
    if payload.unit_price < 0.0 {
        return Err(AppError::Validation(vec![FieldError::new(
            "unit_price",
            "must not be negative",
        )]));
    }
    let product = state
        .db
        .create_product(
            &payload.name,
            &payload.sku,
            payload.category.as_deref(),
            payload.unit_price,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<Json<Product>, AppError> {
    state
        .db
        .get_product(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("product"))
}

pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    user.require_role(ROLE_MANAGER)?;
    if state.db.delete_product(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("product"))
    }
}

/// POST /api/products/:id/image — multipart upload, stored via object_store.
/// Fails with 503 when no blob store is configured; other requests are
/// unaffected.
pub async fn upload_product_image(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, AppError> {
    user.require_role(ROLE_MANAGER)?;

    let blob = state.blob.as_ref().ok_or(AppError::StorageNotConfigured)?;

    if state.db.get_product(id).await?.is_none() {
        return Err(AppError::NotFound("product"));
    }

    let field = multipart
        .next_field()
        .await
        .map_err(|_| {
            AppError::Validation(vec![FieldError::new("file", "malformed multipart body")])
        })?
        .ok_or_else(|| {
            AppError::Validation(vec![FieldError::new("file", "missing image field")])
        })?;

    let extension = match field.content_type() {
        Some("image/png") => "png",
        Some("image/jpeg") => "jpg",
        Some("image/webp") => "webp",
        _ => {
            return Err(AppError::Validation(vec![FieldError::new(
                "file",
                "unsupported image type",
            )]))
        }
    };

    let data = field.bytes().await.map_err(|_| {
        AppError::Validation(vec![FieldError::new("file", "failed to read image body")])
    })?;

    let path = blob.put_image(id, extension, data).await?;
    state.db.set_product_image(id, &path).await?;

    Ok(Json(serde_json::json!({ "image_path": path })))
}

// ── Staff handlers ───────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateStaffRequest {
    pub user_id: Uuid,
    pub store_id: i32,
    pub position: Option<String>,
}

pub async fn list_staff(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
    Query(filter): Query<StoreFilter>,
) -> Result<Json<Vec<Staff>>, AppError> {
    Ok(Json(state.db.list_staff(filter.store_id).await?))
}

pub async fn create_staff(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateStaffRequest>,
) -> Result<(StatusCode, Json<Staff>), AppError> {
    user.require_role(ROLE_MANAGER)?;
    let staff = state
        .db
        .create_staff(payload.user_id, payload.store_id, payload.position.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(staff)))
}

pub async fn delete_staff(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    user.require_role(ROLE_MANAGER)?;
    if state.db.delete_staff(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("staff member"))
    }
}

// ── Placement handlers ───────────────────────────────────────

pub async fn list_placements(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
    Query(filter): Query<ShelfFilter>,
) -> Result<Json<Vec<ProductShelf>>, AppError> {
    Ok(Json(state.db.list_placements(filter.shelf_id).await?))
}

pub async fn upsert_placement(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<UpsertPlacementRequest>,
) -> Result<Json<ProductShelf>, AppError> {
    user.require_role(ROLE_MANAGER)?;
    if payload.quantity < 0 || payload.restock_threshold < 0 {
        return Err(AppError::Validation(vec![FieldError::new(
            "quantity",
            "quantity and threshold must not be negative",
        )]));
    }
    let placement = state
        .db
        .upsert_placement(
            payload.product_id,
            payload.shelf_id,
            payload.quantity,
            payload.restock_threshold,
        )
        .await?;
    Ok(Json(placement))
}

// ── Restock task handlers ────────────────────────────────────

pub async fn list_restock_tasks(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<RestockTask>>, AppError> {
    Ok(Json(state.db.list_restock_tasks(filter.status.as_deref()).await?))
}

pub async fn create_restock_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateRestockTaskRequest>,
) -> Result<(StatusCode, Json<RestockTask>), AppError> {
    user.require_role(ROLE_MANAGER)?;
    let task = state
        .db
        .create_restock_task(
            payload.product_id,
            payload.shelf_id,
            payload.quantity,
            payload.assigned_to,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn complete_restock_task(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    if state.db.complete_restock_task(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("restock task"))
    }
}

// ── Stock request handlers ───────────────────────────────────

pub async fn list_stock_requests(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<StockRequest>>, AppError> {
    Ok(Json(state.db.list_stock_requests(filter.status.as_deref()).await?))
}

pub async fn create_stock_request(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateStockRequestRequest>,
) -> Result<(StatusCode, Json<StockRequest>), AppError> {
    // Any authenticated role may raise a request; the claims carry the
    // subject email, the row needs the user id.
    let requester = state
        .db
        .find_user_by_email(&user.subject)
        .await?
        .ok_or(AppError::Authentication)?;

    let request = state
        .db
        .create_stock_request(
            payload.product_id,
            payload.store_id,
            requester.id,
            payload.quantity,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn decide_stock_request(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
    Json(payload): Json<DecisionRequest>,
) -> Result<StatusCode, AppError> {
    user.require_role(ROLE_MANAGER)?;
    let approve = match payload.decision.as_str() {
        "approved" => true,
        "rejected" => false,
        _ => {
            return Err(AppError::Validation(vec![FieldError::new(
                "decision",
                "must be 'approved' or 'rejected'",
            )]))
        }
    };
    if state.db.decide_stock_request(id, approve).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("pending stock request"))
    }
}

// ── Sales handlers ───────────────────────────────────────────

pub async fn record_sale(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
    Json(payload): Json<RecordSaleRequest>,
) -> Result<(StatusCode, Json<SalesRecord>), AppError> {
    if payload.units_sold <= 0 {
        return Err(AppError::Validation(vec![FieldError::new(
            "units_sold",
            "must be positive",
        )]));
    }
    let sale_date = payload.sale_date.unwrap_or_else(|| Utc::now().date_naive());
    let record = state
        .db
        .record_sale(payload.product_id, payload.store_id, payload.units_sold, sale_date)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

// ── Alert handlers ───────────────────────────────────────────

/// GET /api/alerts — recent alerts, newest first, backing the dashboard
/// home view.
pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
    Query(query): Query<AlertQuery>,
) -> Result<Json<Vec<ReplenishmentAlert>>, AppError> {
    let limit = query.limit.unwrap_or(100).clamp(1, 500);
    Ok(Json(state.db.list_alerts(limit).await?))
}
