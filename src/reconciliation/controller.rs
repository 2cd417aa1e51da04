//! # Run Controller
//!
//! The only entry point a scheduler calls. A run always completes normally:
//! errors and panics are classified, logged as fatal events and swallowed.

use super::engine::ReconciliationEngine;
use crate::clock::Clock;
use crate::config::MessageTemplates;
use crate::constants::{LogEventType, LogLevel};
use crate::error::{ErrorKind, ReconcilerError};
use crate::logging::{EventLogger, LogEvent};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

pub struct RunController {
    engine: Arc<ReconciliationEngine>,
    logger: Arc<dyn EventLogger>,
    clock: Arc<dyn Clock>,
    messages: MessageTemplates,
}

impl RunController {
    pub fn new(
        engine: Arc<ReconciliationEngine>,
        logger: Arc<dyn EventLogger>,
        clock: Arc<dyn Clock>,
        messages: MessageTemplates,
    ) -> Self {
        Self {
            engine,
            logger,
            clock,
            messages,
        }
    }

    pub fn engine(&self) -> &Arc<ReconciliationEngine> {
        &self.engine
    }

    /// Execute one reconciliation run
    pub async fn execute(&self, allow_extra_iterations: bool) {
        let run_id = Uuid::new_v4();
        let span = info_span!("reconciliation_run", %run_id, allow_extra_iterations);

        async {
            let started = Instant::now();
            info!("Reconciliation run started");

            let outcome = AssertUnwindSafe(self.engine.run_process(allow_extra_iterations))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(())) => info!(
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Reconciliation run completed"
                ),
                Ok(Err(err)) => self.report_failure(&err),
                Err(panic) => {
                    let err = ReconcilerError::Unclassified(panic_message(panic.as_ref()));
                    self.report_failure(&err);
                }
            }
        }
        .instrument(span)
        .await
    }

    fn report_failure(&self, err: &ReconcilerError) {
        let (event_type, template) = match err.kind() {
            ErrorKind::RemoteService => (
                LogEventType::StatusRequestFailed,
                &self.messages.fatal_remote_service_error,
            ),
            ErrorKind::DataAccess => (LogEventType::DataAccessError, &self.messages.fatal_db_error),
            ErrorKind::Unclassified => (
                LogEventType::MainProcessFailed,
                &self.messages.fatal_unexpected_error,
            ),
        };

        error!(kind = ?err.kind(), error = %err, "Reconciliation run failed");

        self.logger.log_event(
            LogEvent::new(event_type, LogLevel::Fatal, format!("{template}: {err}"))
                .with_cause(err)
                .at(self.clock.now()),
        );
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panic: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panic: {message}")
    } else {
        "panic with non-string payload".to_string()
    }
}
