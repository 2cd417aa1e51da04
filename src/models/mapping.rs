use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Raw row of the status mapping table
///
/// Maps to the rows returned by the `MapStatuses` read procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MappingRow {
    /// Provider-status identifier (primary key of the mapping row)
    pub id: i64,
    /// Canonical status identifier
    pub status_id: i64,
    pub delivery_service_status_code: String,
    pub delivery_service_status_name: String,
    pub delivery_service_id: String,
}
