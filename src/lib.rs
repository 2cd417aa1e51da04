#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Order Status Reconciler
//!
//! Periodically brings stored order delivery statuses in line with what the
//! delivery services report.
//!
//! ## Overview
//!
//! Each run loads the orders whose status is stale, asks the delivery provider
//! for their current statuses in one batched call, maps every provider status
//! to the internal status identifiers through a [`StatusDictionary`], and
//! writes the results back. Orders that cannot be resolved are retried on the
//! same run in a few sub-iterations of the configured update period.
//!
//! ## Module Organization
//!
//! - [`reconciliation`] - Status source, round/retry engine and run controller
//! - [`dictionary`] - Provider status to internal status lookup
//! - [`database`] - PostgreSQL stored-procedure persistence
//! - [`provider`] - Delivery provider trait and HTTP client
//! - [`models`] - Records read, reported and written per round
//! - [`logging`] - Structured logging and the event log collaborator
//! - [`config`] - YAML configuration with environment overrides
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use status_reconciler::clock::SystemClock;
//! use status_reconciler::config::ConfigManager;
//! use status_reconciler::database::{connect, PgStatusRepository};
//! use status_reconciler::logging::TracingEventLogger;
//! use status_reconciler::provider::HttpDeliveryProvider;
//! use status_reconciler::reconciliation::{
//!     ProviderStatusAdapter, ReconciliationEngine, RunController,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let config = manager.config();
//!
//! let pool = connect(&config.database).await?;
//! let repository = Arc::new(PgStatusRepository::new(pool, &config.database)?);
//! let provider = Arc::new(HttpDeliveryProvider::new(config.provider.http.clone())?);
//! let logger = Arc::new(TracingEventLogger);
//! let clock = Arc::new(SystemClock);
//!
//! let source = ProviderStatusAdapter::new(
//!     provider,
//!     logger.clone(),
//!     clock.clone(),
//!     config.messages.clone(),
//! );
//! let engine = ReconciliationEngine::new(
//!     repository,
//!     Arc::new(source),
//!     logger.clone(),
//!     clock.clone(),
//!     config.schedule.clone(),
//!     config.messages.clone(),
//! )?;
//!
//! RunController::new(Arc::new(engine), logger, clock, config.messages.clone())
//!     .execute(config.schedule.allow_extra_iterations)
//!     .await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! The [`test_helpers`] module provides in-memory collaborators:
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # All tests
//! ```

pub mod clock;
pub mod config;
pub mod constants;
pub mod database;
pub mod dictionary;
pub mod error;
pub mod logging;
pub mod models;
pub mod provider;
pub mod reconciliation;
pub mod test_helpers;

pub use clock::{Clock, SystemClock};
pub use config::{ConfigManager, ReconcilerConfig};
pub use constants::{LogEventType, LogLevel};
pub use database::{PgEventLogger, PgStatusRepository, StatusRepository};
pub use dictionary::{DictionaryBuildError, StatusDictionary, StatusIds};
pub use error::{ErrorCause, ErrorKind, ReconcilerError, Result};
pub use logging::{EventLogger, LogEvent, TracingEventLogger};
pub use models::{
    DeliveryServiceInfo, EventLogEntry, MappingRow, ProviderStatusResult, ResolvedStatus,
    RoundResult, StaleOrderRecord, UnresolvedStatus,
};
pub use provider::{DeliveryProvider, HttpDeliveryProvider, ProviderError};
pub use reconciliation::{
    ProviderStatusAdapter, ReconciliationEngine, RoundOutcome, RunController, StatusSource,
};
