use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordered urgency category: low < medium < high < critical.
/// Stored as text in the `replenishment_alerts` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    /// Bucket a days-to-depletion projection into an urgency level.
    /// Only meaningful for pairs already under the low-stock window.
    pub fn from_days_left(days_left: f64) -> Self {
        if days_left <= 0.5 {
            Urgency::Critical
        } else if days_left <= 1.0 {
            Urgency::High
        } else if days_left <= 2.0 {
            Urgency::Medium
        } else {
            Urgency::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
            Urgency::Critical => "critical",
        }
    }
}

/// An alert record is immutable after creation; the dashboard reads it,
/// nothing updates it.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct ReplenishmentAlert {
    pub id: i32,
    pub product_id: i32,
    pub shelf_id: i32,
    pub urgency: Urgency,
    pub days_to_depletion: f64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgency_is_ordered() {
        assert!(Urgency::Low < Urgency::Medium);
        assert!(Urgency::Medium < Urgency::High);
        assert!(Urgency::High < Urgency::Critical);
    }

    #[test]
    fn bucket_boundaries() {
        assert_eq!(Urgency::from_days_left(0.0), Urgency::Critical);
        assert_eq!(Urgency::from_days_left(0.5), Urgency::Critical);
        assert_eq!(Urgency::from_days_left(0.51), Urgency::High);
        assert_eq!(Urgency::from_days_left(1.0), Urgency::High);
        assert_eq!(Urgency::from_days_left(1.5), Urgency::Medium);
        assert_eq!(Urgency::from_days_left(2.0), Urgency::Medium);
        assert_eq!(Urgency::from_days_left(2.5), Urgency::Low);
    }

    #[test]
    fn urgency_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Urgency::Critical).unwrap(),
            "\"critical\""
        );
    }
}
