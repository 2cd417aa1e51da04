use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order whose provider status matched a mapping entry
///
/// Serialized field names match the columns of the
/// `OrderStatusActualSuccessInfo` update procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedStatus {
    pub order_id: i64,
    pub delivery_service_status_id: i64,
    pub status_id: i64,
    pub last_status_sync_time: DateTime<Utc>,
    pub delivery_service_order_id: Option<String>,
    pub city_name: Option<String>,
    pub return_order_number: Option<String>,
}

/// Order that could not be resolved this round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedStatus {
    pub order_id: i64,
    pub failed_date_time: DateTime<Utc>,
}

/// Partition produced by a single resolution round
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundResult {
    pub resolved: Vec<ResolvedStatus>,
    pub unresolved: Vec<UnresolvedStatus>,
}

impl RoundResult {
    pub fn has_unresolved(&self) -> bool {
        !self.unresolved.is_empty()
    }

    pub fn unresolved_order_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.unresolved.iter().map(|u| u.order_id)
    }
}
