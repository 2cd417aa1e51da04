use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Row of the datastore event log
///
/// Maps to the rows returned by the `EventLogOrderInfo` read procedure. Event
/// type and level are kept as stored text, since the table also holds entries
/// written by other producers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct EventLogEntry {
    pub id: i64,
    pub order_id: Option<i64>,
    pub event_type: String,
    pub level: String,
    pub message: String,
    pub cause: Option<String>,
    pub event_time: DateTime<Utc>,
}

impl fmt::Display for EventLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.event_time.to_rfc3339(),
            self.level,
            self.event_type
        )?;
        if let Some(order_id) = self.order_id {
            write!(f, " order={order_id}")?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, " ({cause})")?;
        }
        Ok(())
    }
}
