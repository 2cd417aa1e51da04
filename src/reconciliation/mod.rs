//! # Reconciliation
//!
//! [`StatusSource`] resolves one batch, [`ReconciliationEngine`] runs the
//! primary and retry rounds, and [`RunController`] wraps a run so that it
//! never fails back into the scheduler.

pub mod controller;
pub mod engine;
pub mod status_source;

pub use controller::RunController;
pub use engine::{ReconciliationEngine, RoundOutcome};
pub use status_source::{ProviderStatusAdapter, StatusSource};
