use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Delivery service known to the datastore
///
/// Maps to the rows returned by the `DeliveryServiceIdAndName` read procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DeliveryServiceInfo {
    pub delivery_service_id: String,
    pub delivery_service_name: String,
}
