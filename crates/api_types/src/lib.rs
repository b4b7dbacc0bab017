use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod dispenser {
    use super::*;

    /// Request body for `POST /dispenser`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct DispenserNew {
        /// Flow rate in liters per second. Must be positive.
        pub flow_volume: f64,
    }

    /// Response body for a created dispenser.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct DispenserCreated {
        pub id: Uuid,
        pub flow_volume: f64,
    }

    /// Request body for `PUT /dispenser/{id}/status`.
    ///
    /// Both fields stay raw strings on the wire: the engine's transition
    /// rules own canonicalization and timestamp parsing, so a malformed
    /// value is reported with the right error instead of a generic
    /// deserialization failure.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct StatusChange {
        /// "open" or "closed", case-insensitive.
        pub status: String,
        /// ISO-8601 date-time of the change.
        pub updated_at: String,
    }
}

pub mod spending {
    use super::*;

    /// Response body for `GET /dispenser/{id}/spending`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SpendingResponse {
        /// Total cost across all usages, projected to "now" when a usage is
        /// still open. Rounded to 2 decimal places.
        pub amount: f64,
        pub usages: Vec<UsageView>,
    }

    /// One usage interval as exposed to clients.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct UsageView {
        pub opened_at: DateTime<Utc>,
        /// Absent while the usage is still running.
        pub closed_at: Option<DateTime<Utc>>,
        pub flow_volume: f64,
        pub total_spent: f64,
    }
}
