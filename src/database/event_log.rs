use super::repository::{write_query, ProcedureNames};
use crate::logging::{emit_to_tracing, EventLogger, LogEvent};
use parking_lot::Mutex;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Event logger that mirrors every event to `tracing` and writes it to the
/// datastore event log in the background.
///
/// Writes are spawned on the current Tokio runtime and never awaited by the
/// caller; a failed write is reported through `tracing` only. Pending writes
/// are tracked, and [`flush`](Self::flush) must be awaited before the runtime
/// shuts down or the last events of a run are lost.
#[derive(Debug, Clone)]
pub struct PgEventLogger {
    pool: PgPool,
    procedure: Arc<str>,
    pending: Arc<Mutex<JoinSet<()>>>,
}

impl PgEventLogger {
    pub fn new(pool: PgPool, procedures: &ProcedureNames) -> Self {
        Self {
            pool,
            procedure: Arc::from(procedures.event_log.as_str()),
            pending: Arc::default(),
        }
    }

    /// Writes spawned but not yet collected by [`flush`](Self::flush)
    pub fn pending_writes(&self) -> usize {
        self.pending.lock().len()
    }

    /// Wait for every spawned write to finish.
    ///
    /// Events logged while flushing are waited for as well. Returns the
    /// number of writes collected.
    pub async fn flush(&self) -> usize {
        let mut collected = 0;

        loop {
            let mut writes = std::mem::take(&mut *self.pending.lock());
            if writes.is_empty() {
                break;
            }

            while let Some(joined) = writes.join_next().await {
                collected += 1;
                if let Err(e) = joined {
                    warn!(error = %e, "Event log write task did not complete");
                }
            }
        }

        debug!(writes = collected, "Event log flushed");
        collected
    }
}

impl EventLogger for PgEventLogger {
    fn log_event(&self, event: LogEvent) {
        emit_to_tracing(&event);

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime available, event not persisted");
            return;
        };

        let payload = match serde_json::to_value([&event]) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Could not serialize event for the event log");
                return;
            }
        };

        let pool = self.pool.clone();
        let procedure = Arc::clone(&self.procedure);
        let mut pending = self.pending.lock();

        // Drop finished writes so a long run does not accumulate handles.
        while pending.try_join_next().is_some() {}

        pending.spawn_on(
            async move {
                if let Err(e) = sqlx::query(&write_query(&procedure))
                    .bind(payload)
                    .execute(&pool)
                    .await
                {
                    warn!(procedure = %procedure, error = %e, "Failed to persist event log entry");
                }
            },
            &handle,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{LogEventType, LogLevel};
    use sqlx::postgres::PgPoolOptions;
    use std::time::Duration;

    fn unreachable_logger() -> PgEventLogger {
        // Nothing listens on port 9; every write fails quickly on connect.
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(500))
            .connect_lazy("postgres://reconciler@127.0.0.1:9/statuses")
            .unwrap();
        let procedures = ProcedureNames::from_prefixes("get_", "upd_").unwrap();
        PgEventLogger::new(pool, &procedures)
    }

    fn event(message: &str) -> LogEvent {
        LogEvent::new(LogEventType::StatusRequestFailed, LogLevel::Fatal, message)
    }

    #[tokio::test]
    async fn test_flush_waits_for_pending_writes() {
        let logger = unreachable_logger();

        logger.log_event(event("provider down"));
        logger.log_event(event("provider still down"));
        logger.log_event(event("giving up"));
        assert_eq!(logger.pending_writes(), 3);

        assert_eq!(logger.flush().await, 3);
        assert_eq!(logger.pending_writes(), 0);
    }

    #[tokio::test]
    async fn test_clones_share_pending_writes() {
        let logger = unreachable_logger();
        let engine_side = logger.clone();

        engine_side.log_event(event("no orders"));

        assert_eq!(logger.pending_writes(), 1);
        assert_eq!(logger.flush().await, 1);
        assert_eq!(engine_side.pending_writes(), 0);
    }

    #[tokio::test]
    async fn test_flush_without_writes_returns_immediately() {
        let logger = unreachable_logger();
        assert_eq!(logger.flush().await, 0);
    }
}
