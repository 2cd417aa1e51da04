//! # Test Helpers
//!
//! In-memory stand-ins for the datastore, the delivery provider, the event
//! log and the clock. Every fake records how it was called so tests can assert
//! on persistence and provider traffic without a database or network.

use crate::clock::Clock;
use crate::constants::LogEventType;
use crate::database::StatusRepository;
use crate::error::{ReconcilerError, Result};
use crate::logging::{EventLogger, LogEvent};
use crate::models::{
    DeliveryServiceInfo, EventLogEntry, MappingRow, ProviderStatusResult, ProviderStatuses,
    ResolvedStatus, StaleOrderRecord, UnresolvedStatus,
};
use crate::provider::{DeliveryProvider, ProviderError};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// Repository operations a test can make fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    LoadMappingRows,
    LoadStaleOrderRecords,
    LoadDeliveryServices,
    LoadEventLog,
    SaveResolved,
    SaveUnresolved,
}

#[derive(Debug, Clone)]
enum Fault {
    Error(ReconcilerError),
    Panic(String),
}

#[derive(Debug, Default)]
struct RepositoryState {
    mapping_row_loads: usize,
    stale_record_loads: usize,
    saved_resolved: Vec<Vec<ResolvedStatus>>,
    saved_unresolved: Vec<Vec<UnresolvedStatus>>,
}

/// Datastore fake holding fixed rows and recording every write
#[derive(Debug, Default)]
pub struct InMemoryStatusRepository {
    mapping_rows: Vec<MappingRow>,
    stale_records: Vec<StaleOrderRecord>,
    delivery_services: Vec<DeliveryServiceInfo>,
    event_log: Vec<EventLogEntry>,
    faults: HashMap<RepositoryOperation, Fault>,
    state: Mutex<RepositoryState>,
}

impl InMemoryStatusRepository {
    pub fn with_mapping_rows(mut self, rows: Vec<MappingRow>) -> Self {
        self.mapping_rows = rows;
        self
    }

    pub fn with_stale_records(mut self, records: Vec<StaleOrderRecord>) -> Self {
        self.stale_records = records;
        self
    }

    pub fn with_delivery_services(mut self, services: Vec<DeliveryServiceInfo>) -> Self {
        self.delivery_services = services;
        self
    }

    pub fn with_event_log(mut self, entries: Vec<EventLogEntry>) -> Self {
        self.event_log = entries;
        self
    }

    /// Make `operation` return `error`
    pub fn fail_on(mut self, operation: RepositoryOperation, error: ReconcilerError) -> Self {
        self.faults.insert(operation, Fault::Error(error));
        self
    }

    /// Make `operation` panic with `message`
    pub fn panic_on(mut self, operation: RepositoryOperation, message: impl Into<String>) -> Self {
        self.faults.insert(operation, Fault::Panic(message.into()));
        self
    }

    pub fn mapping_row_loads(&self) -> usize {
        self.state.lock().mapping_row_loads
    }

    pub fn stale_record_loads(&self) -> usize {
        self.state.lock().stale_record_loads
    }

    /// Every `save_resolved` batch, in call order
    pub fn saved_resolved(&self) -> Vec<Vec<ResolvedStatus>> {
        self.state.lock().saved_resolved.clone()
    }

    /// Every `save_unresolved` batch, in call order
    pub fn saved_unresolved(&self) -> Vec<Vec<UnresolvedStatus>> {
        self.state.lock().saved_unresolved.clone()
    }

    fn check(&self, operation: RepositoryOperation) -> Result<()> {
        match self.faults.get(&operation) {
            None => Ok(()),
            Some(Fault::Error(err)) => Err(err.clone()),
            Some(Fault::Panic(message)) => panic!("{message}"),
        }
    }
}

#[async_trait]
impl StatusRepository for InMemoryStatusRepository {
    async fn load_mapping_rows(&self) -> Result<Vec<MappingRow>> {
        self.state.lock().mapping_row_loads += 1;
        self.check(RepositoryOperation::LoadMappingRows)?;
        Ok(self.mapping_rows.clone())
    }

    async fn load_stale_order_records(&self) -> Result<Vec<StaleOrderRecord>> {
        self.state.lock().stale_record_loads += 1;
        self.check(RepositoryOperation::LoadStaleOrderRecords)?;
        Ok(self.stale_records.clone())
    }

    async fn load_delivery_services(&self) -> Result<Vec<DeliveryServiceInfo>> {
        self.check(RepositoryOperation::LoadDeliveryServices)?;
        Ok(self.delivery_services.clone())
    }

    async fn load_event_log(&self) -> Result<Vec<EventLogEntry>> {
        self.check(RepositoryOperation::LoadEventLog)?;
        Ok(self.event_log.clone())
    }

    async fn save_resolved(&self, statuses: &[ResolvedStatus]) -> Result<()> {
        self.check(RepositoryOperation::SaveResolved)?;
        self.state.lock().saved_resolved.push(statuses.to_vec());
        Ok(())
    }

    async fn save_unresolved(&self, statuses: &[UnresolvedStatus]) -> Result<()> {
        self.check(RepositoryOperation::SaveUnresolved)?;
        self.state.lock().saved_unresolved.push(statuses.to_vec());
        Ok(())
    }
}

/// A request the scripted provider received
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub records: Vec<StaleOrderRecord>,
    pub include_already_delivered: bool,
}

/// Provider fake answering each call with the next queued response.
///
/// Once the queue is drained every call answers with an empty response.
#[derive(Debug)]
pub struct ScriptedProvider {
    name: String,
    supported: Vec<String>,
    responses: Mutex<VecDeque<std::result::Result<ProviderStatuses, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(supported: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: "scripted".to_string(),
            supported: supported.into_iter().map(Into::into).collect(),
            responses: Mutex::default(),
            requests: Mutex::default(),
        }
    }

    /// Queue a successful response
    pub fn push_response<I, K>(&self, statuses: I)
    where
        I: IntoIterator<Item = (K, Vec<ProviderStatusResult>)>,
        K: Into<String>,
    {
        let statuses = statuses
            .into_iter()
            .map(|(key, results)| (key.into(), results))
            .collect();
        self.responses.lock().push_back(Ok(statuses));
    }

    /// Queue a transport failure
    pub fn push_failure(&self, reason: impl Into<String>) {
        self.responses.lock().push_back(Err(ProviderError::Transport {
            provider: self.name.clone(),
            reason: reason.into(),
        }));
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().clone()
    }

    /// Order ids of every request, in call order
    pub fn requested_order_ids(&self) -> Vec<Vec<i64>> {
        self.requests
            .lock()
            .iter()
            .map(|request| request.records.iter().map(|r| r.order_id).collect())
            .collect()
    }
}

#[async_trait]
impl DeliveryProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_delivery_service_keys(&self) -> &[String] {
        &self.supported
    }

    async fn fetch_statuses(
        &self,
        records: &[StaleOrderRecord],
        include_already_delivered: bool,
    ) -> std::result::Result<ProviderStatuses, ProviderError> {
        self.requests.lock().push(ProviderRequest {
            records: records.to_vec(),
            include_already_delivered,
        });
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(ProviderStatuses::new()))
    }
}

/// Event logger that keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingEventLogger {
    events: Mutex<Vec<LogEvent>>,
}

impl RecordingEventLogger {
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().clone()
    }

    pub fn events_of(&self, event_type: LogEventType) -> Vec<LogEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.event_type == event_type)
            .cloned()
            .collect()
    }
}

impl EventLogger for RecordingEventLogger {
    fn log_event(&self, event: LogEvent) {
        self.events.lock().push(event);
    }
}

/// Clock pinned to a settable instant; defaults to 2026-01-01T00:00:00Z
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::at(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
