//! # PostgreSQL Status Repository
//!
//! Reads go through set-returning functions, writes through functions that
//! take the whole batch as a JSON array:
//!
//! ```sql
//! SELECT * FROM "get_MapStatuses"();
//! SELECT "upd_OrderStatusActualSuccessInfo"($1::jsonb);
//! ```

use super::StatusRepository;
use crate::config::DatabaseConfig;
use crate::error::{ReconcilerError, Result};
use crate::models::{
    DeliveryServiceInfo, EventLogEntry, MappingRow, ResolvedStatus, StaleOrderRecord,
    UnresolvedStatus,
};
use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use std::time::Instant;
use tracing::{debug, error, instrument};

/// Fully qualified stored-function names, derived once from the configured
/// prefixes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureNames {
    pub mapping_rows: String,
    pub stale_orders: String,
    pub delivery_services: String,
    pub event_log_entries: String,
    pub resolved: String,
    pub unresolved: String,
    pub event_log: String,
}

impl ProcedureNames {
    pub fn from_prefixes(read_prefix: &str, update_prefix: &str) -> Result<Self> {
        validate_prefix("database.read_procedure_prefix", read_prefix)?;
        validate_prefix("database.update_procedure_prefix", update_prefix)?;

        Ok(Self {
            mapping_rows: format!("{read_prefix}MapStatuses"),
            stale_orders: format!("{read_prefix}OrderOldStatusInfo"),
            delivery_services: format!("{read_prefix}DeliveryServiceIdAndName"),
            event_log_entries: format!("{read_prefix}EventLogOrderInfo"),
            resolved: format!("{update_prefix}OrderStatusActualSuccessInfo"),
            unresolved: format!("{update_prefix}OrderStatusActualFailedInfo"),
            event_log: format!("{update_prefix}EventLog"),
        })
    }
}

/// Prefixes end up inside SQL text, so only identifier characters are allowed.
fn validate_prefix(field: &str, prefix: &str) -> Result<()> {
    if prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Ok(())
    } else {
        Err(ReconcilerError::InvalidArgument(format!(
            "{field} '{prefix}' may only contain ASCII letters, digits and underscores"
        )))
    }
}

pub(crate) fn read_query(procedure: &str) -> String {
    format!(r#"SELECT * FROM "{procedure}"()"#)
}

pub(crate) fn write_query(procedure: &str) -> String {
    format!(r#"SELECT "{procedure}"($1::jsonb)"#)
}

#[derive(Debug, Clone)]
pub struct PgStatusRepository {
    pool: PgPool,
    procedures: ProcedureNames,
}

impl PgStatusRepository {
    pub fn new(pool: PgPool, config: &DatabaseConfig) -> Result<Self> {
        let procedures = ProcedureNames::from_prefixes(
            &config.read_procedure_prefix,
            &config.update_procedure_prefix,
        )?;
        Ok(Self { pool, procedures })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn procedures(&self) -> &ProcedureNames {
        &self.procedures
    }

    async fn read_rows<T>(&self, procedure: &str) -> Result<Vec<T>>
    where
        T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
    {
        let started = Instant::now();
        let rows = sqlx::query_as::<_, T>(&read_query(procedure))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!(procedure = procedure, error = %e, "Read procedure failed");
                ReconcilerError::data_access_from(procedure, e)
            })?;

        debug!(
            procedure = procedure,
            rows = rows.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Read procedure completed"
        );

        Ok(rows)
    }

    async fn write_batch<T: Serialize + Sync>(&self, procedure: &str, batch: &[T]) -> Result<()> {
        let payload = serde_json::to_value(batch)
            .map_err(|e| ReconcilerError::data_access_from(procedure, e))?;
        let started = Instant::now();

        sqlx::query(&write_query(procedure))
            .bind(payload)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(procedure = procedure, error = %e, "Update procedure failed");
                ReconcilerError::data_access_from(procedure, e)
            })?;

        debug!(
            procedure = procedure,
            rows = batch.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Update procedure completed"
        );

        Ok(())
    }
}

#[async_trait]
impl StatusRepository for PgStatusRepository {
    #[instrument(skip(self))]
    async fn load_mapping_rows(&self) -> Result<Vec<MappingRow>> {
        self.read_rows(&self.procedures.mapping_rows).await
    }

    #[instrument(skip(self))]
    async fn load_stale_order_records(&self) -> Result<Vec<StaleOrderRecord>> {
        self.read_rows(&self.procedures.stale_orders).await
    }

    #[instrument(skip(self))]
    async fn load_delivery_services(&self) -> Result<Vec<DeliveryServiceInfo>> {
        self.read_rows(&self.procedures.delivery_services).await
    }

    #[instrument(skip(self))]
    async fn load_event_log(&self) -> Result<Vec<EventLogEntry>> {
        self.read_rows(&self.procedures.event_log_entries).await
    }

    #[instrument(skip(self, statuses), fields(count = statuses.len()))]
    async fn save_resolved(&self, statuses: &[ResolvedStatus]) -> Result<()> {
        self.write_batch(&self.procedures.resolved, statuses).await
    }

    #[instrument(skip(self, statuses), fields(count = statuses.len()))]
    async fn save_unresolved(&self, statuses: &[UnresolvedStatus]) -> Result<()> {
        self.write_batch(&self.procedures.unresolved, statuses).await
    }
}
