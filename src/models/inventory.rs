use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Store {
    pub id: i32,
    pub name: String,
    pub location: Option<String>,
    pub manager_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Shelf {
    pub id: i32,
    pub store_id: i32,
    pub label: String,
    pub aisle: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub sku: String,
    pub category: Option<String>,
    pub unit_price: f64,
    pub image_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A product placement on a shelf: the unit the Alerting Engine evaluates.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct ProductShelf {
    pub id: i32,
    pub product_id: i32,
    pub shelf_id: i32,
    pub quantity: i32,
    pub restock_threshold: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Staff {
    pub id: i32,
    pub user_id: Uuid,
    pub store_id: i32,
    pub position: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct RestockTask {
    pub id: i32,
    pub product_id: i32,
    pub shelf_id: i32,
    pub assigned_to: Option<i32>,
    pub quantity: i32,
    pub status: String, // 'pending' | 'in_progress' | 'completed'
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct StockRequest {
    pub id: i32,
    pub product_id: i32,
    pub store_id: i32,
    pub requested_by: Uuid,
    pub quantity: i32,
    pub status: String, // 'pending' | 'approved' | 'rejected'
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct SalesRecord {
    pub id: i32,
    pub product_id: i32,
    pub store_id: i32,
    pub units_sold: i32,
    pub sale_date: NaiveDate,
}

/// Read-only input to the Alerting Engine: one row per product-shelf pair
/// with current quantity and the computed daily sales velocity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InventorySnapshot {
    pub product_id: i32,
    pub shelf_id: i32,
    pub product_name: String,
    pub store_id: i32,
    pub quantity: i32,
    pub sales_velocity: f64,
    pub manager_email: Option<String>,
}
