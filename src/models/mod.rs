//! # Reconciliation Models
//!
//! Rows read from the datastore, results reported by providers, and the
//! outcome records written back after each round.

pub mod delivery_service;
pub mod event_log;
pub mod mapping;
pub mod outcome;
pub mod provider_status;
pub mod stale_order;

pub use delivery_service::DeliveryServiceInfo;
pub use event_log::EventLogEntry;
pub use mapping::MappingRow;
pub use outcome::{ResolvedStatus, RoundResult, UnresolvedStatus};
pub use provider_status::{ProviderStatusResult, ProviderStatuses};
pub use stale_order::StaleOrderRecord;
