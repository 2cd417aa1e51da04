use crate::config::DatabaseConfig;
use crate::error::{ReconcilerError, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::info;

/// Open a connection pool for the configured datastore
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
        .connect(&config.url)
        .await
        .map_err(|e| ReconcilerError::data_access_from("connect", e))?;

    info!(
        max_connections = config.max_connections,
        "Database connection pool created"
    );

    Ok(pool)
}
