//! Stock alert checking job.
//!
//! On each tick (hourly, job name `stock-alert-notification`) this module:
//! 1. Loads one inventory snapshot per product-shelf pair.
//! 2. Projects days-to-depletion from quantity and sales velocity.
//! 3. For every pair under the low-stock window, creates an alert record
//!    and emails the store manager, best-effort per pair.
//!
//! A failure on one pair never aborts evaluation of the rest.

use crate::errors::AppError;
use crate::models::alert::Urgency;
use crate::models::inventory::InventorySnapshot;
use crate::notification::email::EmailNotifier;
use crate::store::postgres::PgStore;

/// Guard against division by zero for pairs with no recorded sales.
const VELOCITY_EPSILON: f64 = 0.01;

/// Days-to-depletion projection: quantity / max(velocity, epsilon).
pub fn days_to_depletion(quantity: i32, sales_velocity: f64) -> f64 {
    f64::from(quantity) / sales_velocity.max(VELOCITY_EPSILON)
}

/// Evaluate a single snapshot against the low-stock window.
/// Returns the urgency and projection when the pair is flagged, else None.
pub fn evaluate(snapshot: &InventorySnapshot, low_stock_days: f64) -> Option<(Urgency, f64)> {
    let days_left = days_to_depletion(snapshot.quantity, snapshot.sales_velocity);
    if days_left < low_stock_days {
        Some((Urgency::from_days_left(days_left), days_left))
    } else {
        None
    }
}

/// Run one alerting tick. Called by the scheduler and by the `check-stock`
/// CLI command.
pub async fn run_stock_check(
    db: &PgStore,
    notifier: &EmailNotifier,
    low_stock_days: f64,
) -> anyhow::Result<()> {
    tracing::debug!("stock_check: starting tick");

    let snapshots = db.load_inventory_snapshots().await?;
    tracing::debug!(pairs = snapshots.len(), "stock_check: loaded inventory snapshots");

    let mut created = 0usize;
    let mut failed = 0usize;

    for snapshot in &snapshots {
        match check_pair(db, notifier, snapshot, low_stock_days).await {
            Ok(true) => created += 1,
            Ok(false) => {}
            Err(e) => {
                failed += 1;
                tracing::error!(
                    product_id = snapshot.product_id,
                    shelf_id = snapshot.shelf_id,
                    "stock_check: pair evaluation failed: {}",
                    e
                );
            }
        }
    }

    tracing::info!(created, failed, "stock_check: tick complete");
    Ok(())
}

/// Evaluate one pair; returns true when a new alert was created.
async fn check_pair(
    db: &PgStore,
    notifier: &EmailNotifier,
    snapshot: &InventorySnapshot,
    low_stock_days: f64,
) -> Result<bool, AppError> {
    let Some((urgency, days_left)) = evaluate(snapshot, low_stock_days) else {
        return Ok(false);
    };

    // None means the pair was already alerted at this urgency within the
    // current tick window; nothing to notify.
    let Some(alert) = db
        .insert_alert(snapshot.product_id, snapshot.shelf_id, urgency, days_left)
        .await?
    else {
        return Ok(false);
    };

    tracing::warn!(
        product = %snapshot.product_name,
        shelf_id = snapshot.shelf_id,
        urgency = urgency.as_str(),
        days_left = format!("{:.1}", days_left),
        "stock_check: low-stock alert created"
    );

    // Notification is best-effort: a transport failure must not fail the pair
    // once the alert record exists.
    if let Some(to) = snapshot.manager_email.as_deref() {
        let subject = format!(
            "[ShelfSense] {} running low ({} urgency)",
            snapshot.product_name,
            urgency.as_str()
        );
        let body = alert_email_body(snapshot, urgency, days_left);
        if let Err(e) = notifier.send(to, &subject, &body).await {
            tracing::error!(
                alert_id = alert.id,
                to,
                "stock_check: alert email failed: {}",
                e
            );
        }
    }

    Ok(true)
}

fn alert_email_body(snapshot: &InventorySnapshot, urgency: Urgency, days_left: f64) -> String {
    format!(
        "<html><body>\
         <h2>Low stock alert</h2>\
         <p><b>{product}</b> on shelf {shelf} is projected to deplete in \
         <b>{days:.1} days</b>.</p>\
         <ul>\
         <li>Current quantity: {qty}</li>\
         <li>Sales velocity: {vel:.2} units/day</li>\
         <li>Urgency: {urgency}</li>\
         </ul>\
         </body></html>",
        product = snapshot.product_name,
        shelf = snapshot.shelf_id,
        days = days_left,
        qty = snapshot.quantity,
        vel = snapshot.sales_velocity,
        urgency = urgency.as_str(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(quantity: i32, sales_velocity: f64) -> InventorySnapshot {
        InventorySnapshot {
            product_id: 1,
            shelf_id: 2,
            product_name: "Oat Milk 1L".into(),
            store_id: 3,
            quantity,
            sales_velocity,
            manager_email: Some("manager@example.com".into()),
        }
    }

    #[test]
    fn two_days_left_under_three_day_window_flags_medium() {
        // quantity=10, velocity=5 -> 2 days left
        let result = evaluate(&snapshot(10, 5.0), 3.0);
        let (urgency, days) = result.expect("pair should be flagged");
        assert_eq!(urgency, Urgency::Medium);
        assert!((days - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn hundred_days_left_produces_no_alert() {
        // quantity=100, velocity=1 -> 100 days left
        assert!(evaluate(&snapshot(100, 1.0), 3.0).is_none());
    }

    #[test]
    fn zero_velocity_is_guarded_by_epsilon() {
        // No sales: projection is huge, never flagged, never divides by zero.
        let days = days_to_depletion(10, 0.0);
        assert!(days.is_finite());
        assert!(evaluate(&snapshot(10, 0.0), 3.0).is_none());
    }

    #[test]
    fn zero_quantity_is_critical() {
        let (urgency, days) = evaluate(&snapshot(0, 2.0), 3.0).unwrap();
        assert_eq!(urgency, Urgency::Critical);
        assert_eq!(days, 0.0);
    }

    #[test]
    fn half_day_left_is_critical_one_day_is_high() {
        let (u, _) = evaluate(&snapshot(1, 2.0), 3.0).unwrap(); // 0.5 days
        assert_eq!(u, Urgency::Critical);
        let (u, _) = evaluate(&snapshot(2, 2.0), 3.0).unwrap(); // 1.0 day
        assert_eq!(u, Urgency::High);
    }

    #[test]
    fn email_body_carries_projection() {
        let body = alert_email_body(&snapshot(10, 5.0), Urgency::Medium, 2.0);
        assert!(body.contains("Oat Milk 1L"));
        assert!(body.contains("2.0 days"));
        assert!(body.contains("medium"));
    }
}
