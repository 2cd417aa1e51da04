use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An order whose stored delivery status is due for reconciliation
///
/// Maps to the rows returned by the `OrderOldStatusInfo` read procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct StaleOrderRecord {
    pub order_id: i64,
    /// Delivery service that owns the order
    pub delivery_service_id: String,
    /// Outcome of the previous reconciliation for this order; `Some(false)`
    /// marks an order that already failed before.
    pub success_status_request: Option<bool>,
}

impl StaleOrderRecord {
    pub fn new(order_id: i64, delivery_service_id: impl Into<String>) -> Self {
        Self {
            order_id,
            delivery_service_id: delivery_service_id.into(),
            success_status_request: None,
        }
    }

    pub fn with_previous_outcome(mut self, success: bool) -> Self {
        self.success_status_request = Some(success);
        self
    }

    /// True when a previous reconciliation already recorded a failure
    pub fn previously_failed(&self) -> bool {
        self.success_status_request == Some(false)
    }
}
