//! Integration tests for the alerting engine's evaluation rule and the
//! scheduler's single-flight guard.

use shelfsense::jobs::scheduler;
use shelfsense::jobs::stock_alerts::{days_to_depletion, evaluate};
use shelfsense::models::alert::Urgency;
use shelfsense::models::inventory::InventorySnapshot;

fn snapshot(quantity: i32, sales_velocity: f64) -> InventorySnapshot {
    InventorySnapshot {
        product_id: 42,
        shelf_id: 7,
        product_name: "Rye Bread".into(),
        store_id: 1,
        quantity,
        sales_velocity,
        manager_email: None,
    }
}

#[test]
fn ten_units_at_five_per_day_flags_medium() {
    // quantity=10, velocity=5 units/day -> 2 days to depletion, window 3 days
    let (urgency, days) = evaluate(&snapshot(10, 5.0), 3.0).expect("should flag");
    assert_eq!(days, 2.0);
    assert_eq!(urgency, Urgency::Medium);
}

#[test]
fn hundred_units_at_one_per_day_does_not_flag() {
    assert!(evaluate(&snapshot(100, 1.0), 3.0).is_none());
}

#[test]
fn urgency_escalates_as_depletion_nears() {
    let at = |qty| evaluate(&snapshot(qty, 4.0), 3.0).map(|(u, _)| u);
    assert_eq!(at(1), Some(Urgency::Critical)); // 0.25 days
    assert_eq!(at(4), Some(Urgency::High)); // 1 day
    assert_eq!(at(8), Some(Urgency::Medium)); // 2 days
    assert_eq!(at(11), Some(Urgency::Low)); // 2.75 days
    assert_eq!(at(13), None); // 3.25 days, outside window
}

#[test]
fn velocity_epsilon_prevents_division_blowup() {
    let days = days_to_depletion(5, 0.0);
    assert!(days.is_finite());
    assert!(days > 3.0);
}

#[tokio::test]
async fn scheduler_guard_serializes_named_job() {
    assert!(scheduler::try_acquire("stock-alert-notification"));
    // A second tick while the first is in flight must be skipped.
    assert!(!scheduler::try_acquire("stock-alert-notification"));
    scheduler::release("stock-alert-notification");
    assert!(scheduler::try_acquire("stock-alert-notification"));
    scheduler::release("stock-alert-notification");
}
