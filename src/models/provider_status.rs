use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One status reported by a provider for one order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderStatusResult {
    pub order_id: i64,
    pub status_code: String,
    /// Status name in the form the mapping table stores it
    pub status_name_for_dictionary: String,
    #[serde(default)]
    pub last_status_sync_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivery_service_order_id: Option<String>,
    #[serde(default)]
    pub city_name: Option<String>,
    #[serde(default)]
    pub return_order_number: Option<String>,
}

impl ProviderStatusResult {
    pub fn new(
        order_id: i64,
        status_code: impl Into<String>,
        status_name_for_dictionary: impl Into<String>,
    ) -> Self {
        Self {
            order_id,
            status_code: status_code.into(),
            status_name_for_dictionary: status_name_for_dictionary.into(),
            last_status_sync_time: None,
            delivery_service_order_id: None,
            city_name: None,
            return_order_number: None,
        }
    }

    pub fn with_sync_time(mut self, synced_at: DateTime<Utc>) -> Self {
        self.last_status_sync_time = Some(synced_at);
        self
    }
}

/// Provider response: delivery-service key to the statuses reported under it
pub type ProviderStatuses = BTreeMap<String, Vec<ProviderStatusResult>>;
