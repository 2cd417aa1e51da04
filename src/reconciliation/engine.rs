//! # Reconciliation Engine
//!
//! Drives one run: load the stale batch, run the primary round, then retry the
//! unresolved subset on a fixed delay while the schedule allows it.
//!
//! ```text
//! Start -> LoadBatch -> Empty: done (warning)
//!                    -> PrimaryRound -> Resolved: done
//!                                    -> Unresolved, no extra rounds: done
//!                                    -> Unresolved -> (Wait, Round)* -> done
//! ```
//!
//! Only the primary round records failures. Retry rounds persist resolved
//! statuses and otherwise only narrow the carried-forward set.

use super::status_source::StatusSource;
use crate::clock::Clock;
use crate::config::{MessageTemplates, ScheduleConfig};
use crate::constants::{LogEventType, LogLevel};
use crate::database::StatusRepository;
use crate::dictionary::{DictionaryBuildError, StatusDictionary};
use crate::error::{ReconcilerError, Result};
use crate::logging::{EventLogger, LogEvent};
use crate::models::{StaleOrderRecord, UnresolvedStatus};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, OnceCell};
use tracing::{debug, info, instrument, warn};

/// Outcome of a single round
#[derive(Debug, Clone, PartialEq)]
pub enum RoundOutcome {
    /// Nothing left unresolved
    Resolved,
    /// Records of this round's input that are still unresolved
    Unresolved(Vec<StaleOrderRecord>),
}

impl RoundOutcome {
    pub fn has_unresolved(&self) -> bool {
        matches!(self, RoundOutcome::Unresolved(_))
    }
}

pub struct ReconciliationEngine {
    repository: Arc<dyn StatusRepository>,
    source: Arc<dyn StatusSource>,
    logger: Arc<dyn EventLogger>,
    clock: Arc<dyn Clock>,
    schedule: ScheduleConfig,
    messages: MessageTemplates,
    dictionary: OnceCell<Arc<StatusDictionary>>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl std::fmt::Debug for ReconciliationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationEngine")
            .field("schedule", &self.schedule)
            .field("dictionary_loaded", &self.dictionary.initialized())
            .field("shutdown_configured", &self.shutdown.is_some())
            .finish()
    }
}

impl ReconciliationEngine {
    pub fn new(
        repository: Arc<dyn StatusRepository>,
        source: Arc<dyn StatusSource>,
        logger: Arc<dyn EventLogger>,
        clock: Arc<dyn Clock>,
        schedule: ScheduleConfig,
        messages: MessageTemplates,
    ) -> Result<Self> {
        if schedule.multiplicity == 0 {
            return Err(ReconcilerError::InvalidArgument(
                "schedule.multiplicity must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            repository,
            source,
            logger,
            clock,
            schedule,
            messages,
            dictionary: OnceCell::new(),
            shutdown: None,
        })
    }

    /// Stop the retry loop when the receiver observes `true`.
    ///
    /// Checked only while waiting between rounds; a round that has started
    /// always runs to completion.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn schedule(&self) -> &ScheduleConfig {
        &self.schedule
    }

    pub fn is_dictionary_loaded(&self) -> bool {
        self.dictionary.initialized()
    }

    /// Load and build the status dictionary on first use.
    ///
    /// A build failure is logged and returned; the next call tries again.
    pub async fn ensure_dictionary(&self) -> Result<Arc<StatusDictionary>> {
        let dictionary = self
            .dictionary
            .get_or_try_init(|| async {
                let rows = self.repository.load_mapping_rows().await?;
                let row_count = rows.len();

                match StatusDictionary::build(rows) {
                    Ok(dictionary) => {
                        info!(entries = dictionary.len(), "Status dictionary loaded");
                        Ok::<_, ReconcilerError>(Arc::new(dictionary))
                    }
                    Err(err) => {
                        self.log_dictionary_failure(&err, row_count);
                        Err(ReconcilerError::from(err))
                    }
                }
            })
            .await?;

        Ok(Arc::clone(dictionary))
    }

    fn log_dictionary_failure(&self, err: &DictionaryBuildError, row_count: usize) {
        let message = match err {
            DictionaryBuildError::DuplicateKey { key, .. } => {
                format!("{}: {key}", self.messages.dictionary_duplicate_key)
            }
            DictionaryBuildError::Empty => self.messages.dictionary_empty.clone(),
        };
        warn!(rows = row_count, error = %err, "Status dictionary could not be built");

        self.logger.log_event(
            LogEvent::new(
                LogEventType::GetMapStatusesDictionaryFailed,
                LogLevel::Error,
                message,
            )
            .with_cause(err)
            .at(self.clock.now()),
        );
    }

    /// Resolve `records` once and persist the outcome.
    ///
    /// Resolved statuses are always persisted, even when there are none. On
    /// the primary round unresolved statuses are persisted too, except for
    /// orders whose record already carried a failed previous outcome.
    #[instrument(skip(self, records), fields(orders = records.len()))]
    pub async fn run_one_round(
        &self,
        records: &[StaleOrderRecord],
        is_primary_round: bool,
    ) -> Result<RoundOutcome> {
        let dictionary = self.ensure_dictionary().await?;
        let result = self.source.resolve(records, &dictionary).await?;

        self.repository.save_resolved(&result.resolved).await?;

        if !result.has_unresolved() {
            debug!(resolved = result.resolved.len(), "Round fully resolved");
            return Ok(RoundOutcome::Resolved);
        }

        let unresolved_ids: HashSet<i64> = result.unresolved_order_ids().collect();
        let carried: Vec<StaleOrderRecord> = records
            .iter()
            .filter(|record| unresolved_ids.contains(&record.order_id))
            .cloned()
            .collect();

        if is_primary_round {
            let previously_failed: HashSet<i64> = records
                .iter()
                .filter(|record| record.previously_failed())
                .map(|record| record.order_id)
                .collect();

            let fresh_failures: Vec<UnresolvedStatus> = result
                .unresolved
                .into_iter()
                .filter(|status| !previously_failed.contains(&status.order_id))
                .collect();

            debug!(
                failures = fresh_failures.len(),
                skipped = previously_failed.len(),
                "Persisting primary round failures"
            );
            self.repository.save_unresolved(&fresh_failures).await?;
        }

        Ok(RoundOutcome::Unresolved(carried))
    }

    /// Run the primary round over the stale batch and any allowed retries.
    pub async fn run_process(&self, allow_extra_iterations: bool) -> Result<()> {
        let records = self.repository.load_stale_order_records().await?;

        if records.is_empty() {
            self.logger.log_event(
                LogEvent::new(
                    LogEventType::ProcessFailed,
                    LogLevel::Warning,
                    self.messages.no_orders.clone(),
                )
                .at(self.clock.now()),
            );
            return Ok(());
        }

        info!(orders = records.len(), "Starting primary round");
        let mut pending = match self.run_one_round(&records, true).await? {
            RoundOutcome::Resolved => return Ok(()),
            RoundOutcome::Unresolved(pending) => pending,
        };

        if !allow_extra_iterations {
            info!(
                unresolved = pending.len(),
                "Primary round left unresolved orders, extra rounds disabled"
            );
            return Ok(());
        }

        let delay = self.schedule.retry_delay();
        let extra_rounds = self.schedule.extra_rounds();

        for round in 1..=extra_rounds {
            if pending.is_empty() {
                debug!("No requested orders left to retry");
                return Ok(());
            }

            if !self.wait_between_rounds(delay).await {
                info!(
                    round,
                    unresolved = pending.len(),
                    "Shutdown requested, skipping remaining rounds"
                );
                return Ok(());
            }

            info!(round, extra_rounds, orders = pending.len(), "Starting retry round");
            match self.run_one_round(&pending, false).await? {
                RoundOutcome::Resolved => return Ok(()),
                RoundOutcome::Unresolved(next) => pending = next,
            }
        }

        info!(
            unresolved = pending.len(),
            "Extra rounds exhausted, leaving orders for the next run"
        );
        Ok(())
    }

    /// Sleep for `delay`; returns false when shutdown was requested instead.
    async fn wait_between_rounds(&self, delay: Duration) -> bool {
        let Some(shutdown) = &self.shutdown else {
            tokio::time::sleep(delay).await;
            return true;
        };

        let mut shutdown = shutdown.clone();
        if *shutdown.borrow_and_update() {
            return false;
        }

        let deadline = tokio::time::Instant::now() + delay;
        let stop_requested = tokio::select! {
            _ = tokio::time::sleep_until(deadline) => return true,
            requested = shutdown.wait_for(|stop| *stop) => requested.is_ok(),
        };
        if stop_requested {
            return false;
        }

        // Sender dropped: nobody can request shutdown any more.
        tokio::time::sleep_until(deadline).await;
        true
    }
}
