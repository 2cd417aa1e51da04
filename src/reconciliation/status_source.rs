//! # Status Sources
//!
//! A [`StatusSource`] turns a batch of stale orders into a [`RoundResult`].
//! [`ProviderStatusAdapter`] is the source backed by a [`DeliveryProvider`]:
//! it filters the batch down to the delivery services the provider supports,
//! issues one batched request and matches every returned status against the
//! [`StatusDictionary`].

use crate::clock::Clock;
use crate::config::MessageTemplates;
use crate::constants::{LogEventType, LogLevel};
use crate::dictionary::{dictionary_key, StatusDictionary};
use crate::error::Result;
use crate::logging::{EventLogger, LogEvent};
use crate::models::{ResolvedStatus, RoundResult, StaleOrderRecord, UnresolvedStatus};
use crate::provider::DeliveryProvider;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};

#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Resolve current statuses for `records`.
    ///
    /// An empty batch is a valid round producing two empty lists. A provider
    /// failure aborts the round with a remote-service error.
    async fn resolve(
        &self,
        records: &[StaleOrderRecord],
        dictionary: &StatusDictionary,
    ) -> Result<RoundResult>;
}

pub struct ProviderStatusAdapter {
    provider: Arc<dyn DeliveryProvider>,
    logger: Arc<dyn EventLogger>,
    clock: Arc<dyn Clock>,
    messages: MessageTemplates,
    include_delivered: bool,
}

impl ProviderStatusAdapter {
    pub fn new(
        provider: Arc<dyn DeliveryProvider>,
        logger: Arc<dyn EventLogger>,
        clock: Arc<dyn Clock>,
        messages: MessageTemplates,
    ) -> Self {
        Self {
            provider,
            logger,
            clock,
            messages,
            include_delivered: false,
        }
    }

    /// Ask the provider for orders it already reports as delivered
    pub fn with_include_delivered(mut self, include_delivered: bool) -> Self {
        self.include_delivered = include_delivered;
        self
    }

    fn log_error(&self, event_type: LogEventType, order_id: i64, message: String) {
        self.logger.log_event(
            LogEvent::new(event_type, LogLevel::Error, message)
                .with_order(order_id)
                .at(self.clock.now()),
        );
    }
}

#[async_trait]
impl StatusSource for ProviderStatusAdapter {
    #[instrument(skip_all, fields(provider = %self.provider.name(), orders = records.len()))]
    async fn resolve(
        &self,
        records: &[StaleOrderRecord],
        dictionary: &StatusDictionary,
    ) -> Result<RoundResult> {
        let (supported, unsupported): (Vec<StaleOrderRecord>, Vec<StaleOrderRecord>) = records
            .iter()
            .cloned()
            .partition(|record| self.provider.supports(&record.delivery_service_id));

        let mut result = RoundResult::default();

        for record in &unsupported {
            result.unresolved.push(UnresolvedStatus {
                order_id: record.order_id,
                failed_date_time: self.clock.now(),
            });
        }

        // No order of the batch can be resolved, so the provider is not asked
        // with an empty request.
        if supported.is_empty() {
            debug!(
                unsupported = unsupported.len(),
                "No orders owned by supported delivery services"
            );
            return Ok(result);
        }

        let statuses = self
            .provider
            .fetch_statuses(&supported, self.include_delivered)
            .await?;

        let received: HashSet<i64> = statuses
            .values()
            .flatten()
            .map(|status| status.order_id)
            .collect();

        for record in supported
            .iter()
            .filter(|record| !received.contains(&record.order_id))
        {
            result.unresolved.push(UnresolvedStatus {
                order_id: record.order_id,
                failed_date_time: self.clock.now(),
            });
            self.log_error(
                LogEventType::StatusRequestFailed,
                record.order_id,
                format!(
                    "{} {}: {}",
                    self.messages.order_status_missing,
                    record.delivery_service_id,
                    record.order_id
                ),
            );
        }

        for (delivery_service_key, provider_statuses) in &statuses {
            for status in provider_statuses {
                let key = dictionary_key(
                    &status.status_code,
                    &status.status_name_for_dictionary,
                    delivery_service_key,
                );
                // The provider may omit the sync time when another process
                // fetched the statuses concurrently.
                let synced_at = status
                    .last_status_sync_time
                    .unwrap_or_else(|| self.clock.now());

                match dictionary.get(&key) {
                    Some(ids) => result.resolved.push(ResolvedStatus {
                        order_id: status.order_id,
                        delivery_service_status_id: ids.delivery_service_status_id,
                        status_id: ids.status_id,
                        last_status_sync_time: synced_at,
                        delivery_service_order_id: status.delivery_service_order_id.clone(),
                        city_name: status.city_name.clone(),
                        return_order_number: status.return_order_number.clone(),
                    }),
                    None => {
                        result.unresolved.push(UnresolvedStatus {
                            order_id: status.order_id,
                            failed_date_time: synced_at,
                        });
                        self.log_error(
                            LogEventType::GetMapStatusesDictionaryFailed,
                            status.order_id,
                            format!(
                                "{} {}: {}",
                                self.messages.dictionary_key_unmatched, delivery_service_key, key
                            ),
                        );
                    }
                }
            }
        }

        debug!(
            resolved = result.resolved.len(),
            unresolved = result.unresolved.len(),
            "Resolution round partitioned"
        );

        Ok(result)
    }
}
