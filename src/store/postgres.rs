//! Postgres persistence for ShelfSense.
//!
//! All writes are individually transactional; the alerting tick deliberately
//! does not wrap its per-pair inserts in a cross-item transaction.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::alert::{ReplenishmentAlert, Urgency};
use crate::models::inventory::{
    InventorySnapshot, Product, ProductShelf, RestockTask, SalesRecord, Shelf, Staff,
    StockRequest, Store,
};
use crate::models::user::{NewUser, User};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // -- User operations --

    pub async fn insert_user(&self, user: &NewUser) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (name, email, phone, password_hash, role, store_id)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id, name, email, phone, password_hash, role, store_id,
                         refresh_token, refresh_token_expires_at, created_at"#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(&user.role)
        .bind(user.store_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("a user with this email already exists".into())
            }
            _ => AppError::Database(e),
        })?;
        Ok(row)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, User>(
            r#"SELECT id, name, email, phone, password_hash, role, store_id,
                      refresh_token, refresh_token_expires_at, created_at
               FROM users WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Rotate the single active refresh token for a user.
    pub async fn update_refresh_token(
        &self,
        user_id: Uuid,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE users SET refresh_token = $2, refresh_token_expires_at = $3 WHERE id = $1",
        )
        .bind(user_id)
        .bind(refresh_token)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // -- Store operations --

    pub async fn create_store(
        &self,
        name: &str,
        location: Option<&str>,
        manager_email: Option<&str>,
    ) -> Result<Store, AppError> {
        let row = sqlx::query_as::<_, Store>(
            r#"INSERT INTO stores (name, location, manager_email)
               VALUES ($1, $2, $3)
               RETURNING id, name, location, manager_email, created_at"#,
        )
        .bind(name)
        .bind(location)
        .bind(manager_email)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_stores(&self) -> Result<Vec<Store>, AppError> {
        let rows = sqlx::query_as::<_, Store>(
            "SELECT id, name, location, manager_email, created_at FROM stores ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_store(&self, id: i32) -> Result<Option<Store>, AppError> {
        let row = sqlx::query_as::<_, Store>(
            "SELECT id, name, location, manager_email, created_at FROM stores WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn delete_store(&self, id: i32) -> Result<bool, AppError> {
        let res = sqlx::query("DELETE FROM stores WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // -- Shelf operations --

    pub async fn create_shelf(
        &self,
        store_id: i32,
        label: &str,
        aisle: Option<&str>,
    ) -> Result<Shelf, AppError> {
        let row = sqlx::query_as::<_, Shelf>(
            r#"INSERT INTO shelves (store_id, label, aisle)
               VALUES ($1, $2, $3)
               RETURNING id, store_id, label, aisle, created_at"#,
        )
        .bind(store_id)
        .bind(label)
        .bind(aisle)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_shelves(&self, store_id: Option<i32>) -> Result<Vec<Shelf>, AppError> {
        let rows = sqlx::query_as::<_, Shelf>(
            r#"SELECT id, store_id, label, aisle, created_at
               FROM shelves
               WHERE ($1::int IS NULL OR store_id = $1)
               ORDER BY id"#,
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn delete_shelf(&self, id: i32) -> Result<bool, AppError> {
        let res = sqlx::query("DELETE FROM shelves WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // -- Product operations --

    pub async fn create_product(
        &self,
        name: &str,
        sku: &str,
        category: Option<&str>,
        unit_price: f64,
    ) -> Result<Product, AppError> {
        let row = sqlx::query_as::<_, Product>(
            r#"INSERT INTO products (name, sku, category, unit_price)
               VALUES ($1, $2, $3, $4)
               RETURNING id, name, sku, category, unit_price, image_path, created_at"#,
        )
        .bind(name)
        .bind(sku)
        .bind(category)
        .bind(unit_price)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("a product with this SKU already exists".into())
            }
            _ => AppError::Database(e),
        })?;
        Ok(row)
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        let rows = sqlx::query_as::<_, Product>(
            "SELECT id, name, sku, category, unit_price, image_path, created_at FROM products ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_product(&self, id: i32) -> Result<Option<Product>, AppError> {
        let row = sqlx::query_as::<_, Product>(
            "SELECT id, name, sku, category, unit_price, image_path, created_at FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn set_product_image(&self, id: i32, image_path: &str) -> Result<bool, AppError> {
        let res = sqlx::query("UPDATE products SET image_path = $2 WHERE id = $1")
            .bind(id)
            .bind(image_path)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn delete_product(&self, id: i32) -> Result<bool, AppError> {
        let res = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // -- Placement (product-shelf) operations --

    /// Create or update a placement. One row per (product, shelf).
    pub async fn upsert_placement(
        &self,
        product_id: i32,
        shelf_id: i32,
        quantity: i32,
        restock_threshold: i32,
    ) -> Result<ProductShelf, AppError> {
        let row = sqlx::query_as::<_, ProductShelf>(
            r#"INSERT INTO product_shelves (product_id, shelf_id, quantity, restock_threshold)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT (product_id, shelf_id) DO UPDATE
                   SET quantity = EXCLUDED.quantity,
                       restock_threshold = EXCLUDED.restock_threshold,
                       updated_at = NOW()
               RETURNING id, product_id, shelf_id, quantity, restock_threshold, updated_at"#,
        )
        .bind(product_id)
        .bind(shelf_id)
        .bind(quantity)
        .bind(restock_threshold)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_placements(&self, shelf_id: Option<i32>) -> Result<Vec<ProductShelf>, AppError> {
        let rows = sqlx::query_as::<_, ProductShelf>(
            r#"SELECT id, product_id, shelf_id, quantity, restock_threshold, updated_at
               FROM product_shelves
               WHERE ($1::int IS NULL OR shelf_id = $1)
               ORDER BY id"#,
        )
        .bind(shelf_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // -- Staff operations --

    pub async fn create_staff(
        &self,
        user_id: Uuid,
        store_id: i32,
        position: Option<&str>,
    ) -> Result<Staff, AppError> {
        let row = sqlx::query_as::<_, Staff>(
            r#"INSERT INTO staff (user_id, store_id, position)
               VALUES ($1, $2, $3)
               RETURNING id, user_id, store_id, position, created_at"#,
        )
        .bind(user_id)
        .bind(store_id)
        .bind(position)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_staff(&self, store_id: Option<i32>) -> Result<Vec<Staff>, AppError> {
        let rows = sqlx::query_as::<_, Staff>(
            r#"SELECT id, user_id, store_id, position, created_at
               FROM staff
               WHERE ($1::int IS NULL OR store_id = $1)
               ORDER BY id"#,
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn delete_staff(&self, id: i32) -> Result<bool, AppError> {
        let res = sqlx::query("DELETE FROM staff WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // -- Restock task operations --

    pub async fn create_restock_task(
        &self,
        product_id: i32,
        shelf_id: i32,
        quantity: i32,
        assigned_to: Option<i32>,
    ) -> Result<RestockTask, AppError> {
        let row = sqlx::query_as::<_, RestockTask>(
            r#"INSERT INTO restock_tasks (product_id, shelf_id, quantity, assigned_to, status)
               VALUES ($1, $2, $3, $4, 'pending')
               RETURNING id, product_id, shelf_id, assigned_to, quantity, status, created_at, completed_at"#,
        )
        .bind(product_id)
        .bind(shelf_id)
        .bind(quantity)
        .bind(assigned_to)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_restock_tasks(&self, status: Option<&str>) -> Result<Vec<RestockTask>, AppError> {
        let rows = sqlx::query_as::<_, RestockTask>(
            r#"SELECT id, product_id, shelf_id, assigned_to, quantity, status, created_at, completed_at
               FROM restock_tasks
               WHERE ($1::text IS NULL OR status = $1)
               ORDER BY created_at DESC"#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn complete_restock_task(&self, id: i32) -> Result<bool, AppError> {
        let res = sqlx::query(
            r#"UPDATE restock_tasks
               SET status = 'completed', completed_at = NOW()
               WHERE id = $1 AND status <> 'completed'"#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    // -- Stock request operations --

    pub async fn create_stock_request(
        &self,
        product_id: i32,
        store_id: i32,
        requested_by: Uuid,
        quantity: i32,
    ) -> Result<StockRequest, AppError> {
        let row = sqlx::query_as::<_, StockRequest>(
            r#"INSERT INTO stock_requests (product_id, store_id, requested_by, quantity, status)
               VALUES ($1, $2, $3, $4, 'pending')
               RETURNING id, product_id, store_id, requested_by, quantity, status, created_at, decided_at"#,
        )
        .bind(product_id)
        .bind(store_id)
        .bind(requested_by)
        .bind(quantity)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_stock_requests(&self, status: Option<&str>) -> Result<Vec<StockRequest>, AppError> {
        let rows = sqlx::query_as::<_, StockRequest>(
            r#"SELECT id, product_id, store_id, requested_by, quantity, status, created_at, decided_at
               FROM stock_requests
               WHERE ($1::text IS NULL OR status = $1)
               ORDER BY created_at DESC"#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Approve or reject a pending request. Returns false if it was not pending.
    pub async fn decide_stock_request(&self, id: i32, approve: bool) -> Result<bool, AppError> {
        let res = sqlx::query(
            r#"UPDATE stock_requests
               SET status = $2, decided_at = NOW()
               WHERE id = $1 AND status = 'pending'"#,
        )
        .bind(id)
        .bind(if approve { "approved" } else { "rejected" })
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    // -- Sales operations --

    pub async fn record_sale(
        &self,
        product_id: i32,
        store_id: i32,
        units_sold: i32,
        sale_date: NaiveDate,
    ) -> Result<SalesRecord, AppError> {
        let row = sqlx::query_as::<_, SalesRecord>(
            r#"INSERT INTO sales_history (product_id, store_id, units_sold, sale_date)
               VALUES ($1, $2, $3, $4)
               RETURNING id, product_id, store_id, units_sold, sale_date"#,
        )
        .bind(product_id)
        .bind(store_id)
        .bind(units_sold)
        .bind(sale_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    // -- Alerting Engine inputs / outputs --

    /// One snapshot row per product-shelf pair: current quantity plus the
    /// average daily sales velocity over the trailing 7 days.
    pub async fn load_inventory_snapshots(&self) -> Result<Vec<InventorySnapshot>, AppError> {
        let rows = sqlx::query_as::<_, InventorySnapshot>(
            r#"
            SELECT
                ps.product_id,
                ps.shelf_id,
                p.name  AS product_name,
                sh.store_id,
                ps.quantity,
                COALESCE(v.velocity, 0)::float8 AS sales_velocity,
                st.manager_email
            FROM product_shelves ps
            JOIN products p  ON p.id  = ps.product_id
            JOIN shelves  sh ON sh.id = ps.shelf_id
            JOIN stores   st ON st.id = sh.store_id
            LEFT JOIN (
                SELECT product_id, store_id, SUM(units_sold)::float8 / 7.0 AS velocity
                FROM sales_history
                WHERE sale_date >= CURRENT_DATE - INTERVAL '7 days'
                GROUP BY product_id, store_id
            ) v ON v.product_id = ps.product_id AND v.store_id = sh.store_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Insert an alert record. A unique index on
    /// (product_id, shelf_id, urgency, hour-of-creation) makes re-runs within
    /// the same tick window no-ops; `None` means the alert already existed.
    pub async fn insert_alert(
        &self,
        product_id: i32,
        shelf_id: i32,
        urgency: Urgency,
        days_to_depletion: f64,
    ) -> Result<Option<ReplenishmentAlert>, AppError> {
        let row = sqlx::query_as::<_, ReplenishmentAlert>(
            r#"INSERT INTO replenishment_alerts (product_id, shelf_id, urgency, days_to_depletion)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT DO NOTHING
               RETURNING id, product_id, shelf_id, urgency, days_to_depletion, created_at"#,
        )
        .bind(product_id)
        .bind(shelf_id)
        .bind(urgency.as_str())
        .bind(days_to_depletion)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_alerts(&self, limit: i64) -> Result<Vec<ReplenishmentAlert>, AppError> {
        let rows = sqlx::query_as::<_, ReplenishmentAlert>(
            r#"SELECT id, product_id, shelf_id, urgency, days_to_depletion, created_at
               FROM replenishment_alerts
               ORDER BY created_at DESC
               LIMIT $1"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // -- Dashboard stats --

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, AppError> {
        let row: (i64, i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM products),
                (SELECT COUNT(*) FROM stores),
                (SELECT COUNT(*) FROM restock_tasks WHERE status <> 'completed'),
                (SELECT COUNT(*) FROM stock_requests WHERE status = 'pending'),
                (SELECT COUNT(*) FROM replenishment_alerts WHERE created_at >= NOW() - INTERVAL '24 hours')
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardStats {
            products: row.0,
            stores: row.1,
            open_restock_tasks: row.2,
            pending_stock_requests: row.3,
            alerts_last_24h: row.4,
        })
    }
}

#[derive(Debug, serde::Serialize)]
pub struct DashboardStats {
    pub products: i64,
    pub stores: i64,
    pub open_restock_tasks: i64,
    pub pending_stock_requests: i64,
    pub alerts_last_24h: i64,
}
