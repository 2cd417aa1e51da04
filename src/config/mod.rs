//! # Reconciler Configuration
//!
//! YAML-based configuration with environment-specific overrides. A single file,
//! `status-reconciler.yaml`, carries the base values; top-level `development`,
//! `test` and `production` sections are merged over them for the active
//! environment.
//!
//! ```yaml
//! schedule:
//!   update_statuses_period_ms: 600000
//!   multiplicity: 4
//!   allow_extra_iterations: true
//!
//! database:
//!   url: "${DATABASE_URL}"
//!   read_procedure_prefix: "get_"
//!   update_procedure_prefix: "upd_"
//!
//! provider:
//!   name: "dostavim"
//!   base_url: "http://integration:9000/api"
//!   supported_delivery_services: ["boxberry", "pecom", "pickpoint"]
//!
//! production:
//!   database:
//!     max_connections: 20
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use status_reconciler::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let schedule = &manager.config().schedule;
//! println!("retry delay: {:?}", schedule.retry_delay());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::provider::HttpProviderConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring status-reconciler.yaml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Active environment, filled in by the loader
    pub environment: String,
    pub schedule: ScheduleConfig,
    pub messages: MessageTemplates,
    pub database: DatabaseConfig,
    pub provider: ProviderConfig,
}

/// Run cadence: the total update period and how many sub-iterations it is
/// divided into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub update_statuses_period_ms: u64,
    pub multiplicity: u32,
    /// Whether the binary asks for retry rounds
    pub allow_extra_iterations: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            update_statuses_period_ms: 600_000,
            multiplicity: 4,
            allow_extra_iterations: true,
        }
    }
}

impl ScheduleConfig {
    /// Delay before each retry round: `period / multiplicity`
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.update_statuses_period_ms / u64::from(self.multiplicity.max(1)))
    }

    /// Number of retry rounds allowed after the primary round
    pub fn extra_rounds(&self) -> u32 {
        self.multiplicity.saturating_sub(1)
    }
}

/// Message templates used for log events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageTemplates {
    pub no_orders: String,
    pub fatal_remote_service_error: String,
    pub fatal_db_error: String,
    pub fatal_unexpected_error: String,
    pub order_status_missing: String,
    pub dictionary_key_unmatched: String,
    pub dictionary_duplicate_key: String,
    pub dictionary_empty: String,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            no_orders: "No orders to process".to_string(),
            fatal_remote_service_error: "Status update aborted: delivery provider failure"
                .to_string(),
            fatal_db_error: "Status update aborted: datastore failure".to_string(),
            fatal_unexpected_error: "Status update aborted: unexpected failure".to_string(),
            order_status_missing: "No status received from delivery service".to_string(),
            dictionary_key_unmatched: "No status mapping for delivery service".to_string(),
            dictionary_duplicate_key: "Duplicate key in status mapping table".to_string(),
            dictionary_empty: "Status mapping table is empty".to_string(),
        }
    }
}

/// Datastore connection and stored-procedure naming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL; `${VAR}` is expanded from the environment
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    /// Read procedures are named `<prefix><EntityName>`
    pub read_procedure_prefix: String,
    /// Write procedures are named `<prefix><EntityName>`
    pub update_procedure_prefix: String,
    /// Also write reconciler events into the datastore event log
    pub persist_event_log: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "${DATABASE_URL}".to_string(),
            max_connections: 5,
            acquire_timeout_seconds: 30,
            read_procedure_prefix: "get_".to_string(),
            update_procedure_prefix: "upd_".to_string(),
            persist_event_log: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(flatten)]
    pub http: HttpProviderConfig,
    /// Ask the provider for orders it already reports as delivered
    #[serde(default)]
    pub include_delivered: bool,
}

impl ReconcilerConfig {
    /// Validate the loaded configuration
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.schedule.multiplicity == 0 {
            return Err(ConfigurationError::invalid_value(
                "schedule.multiplicity",
                "0",
                "multiplicity must be greater than 0",
            ));
        }

        if self.schedule.update_statuses_period_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "schedule.update_statuses_period_ms",
                "0",
                "update period must be greater than 0",
            ));
        }

        if self.database.url.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "database.url",
                "database configuration",
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                "0",
                "pool size must be greater than 0",
            ));
        }

        if self.provider.http.base_url.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "provider.base_url",
                "provider configuration",
            ));
        }

        Ok(())
    }
}
