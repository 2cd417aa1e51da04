//! # Database Operations
//!
//! The persistence collaborator of the reconciler. The datastore exposes its
//! data through stored functions named `<prefix><EntityName>`; this module
//! binds those functions and maps every driver failure to a single
//! data-access error.
//!
//! ## Key Components
//!
//! - [`StatusRepository`] - the operations the reconciliation engine needs
//! - [`PgStatusRepository`] - PostgreSQL implementation over SQLx
//! - [`PgEventLogger`] - event logger that also writes the datastore event log
//! - [`connect`] - pool construction from [`DatabaseConfig`](crate::config::DatabaseConfig)

pub mod connection;
pub mod event_log;
pub mod repository;

use crate::error::Result;
use crate::models::{
    DeliveryServiceInfo, EventLogEntry, MappingRow, ResolvedStatus, StaleOrderRecord,
    UnresolvedStatus,
};
use async_trait::async_trait;

pub use connection::connect;
pub use event_log::PgEventLogger;
pub use repository::{PgStatusRepository, ProcedureNames};

#[async_trait]
pub trait StatusRepository: Send + Sync {
    /// Raw rows of the status mapping table
    async fn load_mapping_rows(&self) -> Result<Vec<MappingRow>>;

    /// Orders whose stored status is due for reconciliation
    async fn load_stale_order_records(&self) -> Result<Vec<StaleOrderRecord>>;

    /// Delivery services registered in the datastore
    async fn load_delivery_services(&self) -> Result<Vec<DeliveryServiceInfo>>;

    /// Entries of the datastore event log
    async fn load_event_log(&self) -> Result<Vec<EventLogEntry>>;

    async fn save_resolved(&self, statuses: &[ResolvedStatus]) -> Result<()>;

    async fn save_unresolved(&self, statuses: &[UnresolvedStatus]) -> Result<()>;
}
