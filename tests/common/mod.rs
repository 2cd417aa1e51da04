//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use status_reconciler::config::{MessageTemplates, ScheduleConfig};
use status_reconciler::models::MappingRow;
use status_reconciler::reconciliation::{
    ProviderStatusAdapter, ReconciliationEngine, RunController,
};
use status_reconciler::test_helpers::{
    FixedClock, InMemoryStatusRepository, RecordingEventLogger, ScriptedProvider,
};

pub fn mapping_row(id: i64, status_id: i64, code: &str, name: &str, ds: &str) -> MappingRow {
    MappingRow {
        id,
        status_id,
        delivery_service_status_code: code.to_string(),
        delivery_service_status_name: name.to_string(),
        delivery_service_id: ds.to_string(),
    }
}

/// `delivered123dsA` -> (9, 2) and `in_transit000dsA` -> (4, 1)
pub fn standard_mapping() -> Vec<MappingRow> {
    vec![
        mapping_row(9, 2, "delivered", "123", "dsA"),
        mapping_row(4, 1, "in_transit", "000", "dsA"),
    ]
}

pub fn schedule(period_ms: u64, multiplicity: u32) -> ScheduleConfig {
    ScheduleConfig {
        update_statuses_period_ms: period_ms,
        multiplicity,
        allow_extra_iterations: true,
    }
}

/// Fully wired run over in-memory collaborators
pub struct Harness {
    pub repository: Arc<InMemoryStatusRepository>,
    pub provider: Arc<ScriptedProvider>,
    pub logger: Arc<RecordingEventLogger>,
    pub clock: Arc<FixedClock>,
    pub engine: Arc<ReconciliationEngine>,
    pub controller: RunController,
}

impl Harness {
    pub fn new(repository: InMemoryStatusRepository, provider: ScriptedProvider) -> Self {
        Self::with_schedule(repository, provider, schedule(400, 4))
    }

    pub fn with_schedule(
        repository: InMemoryStatusRepository,
        provider: ScriptedProvider,
        schedule: ScheduleConfig,
    ) -> Self {
        let repository = Arc::new(repository);
        let provider = Arc::new(provider);
        let logger = Arc::new(RecordingEventLogger::default());
        let clock = Arc::new(FixedClock::default());
        let messages = MessageTemplates::default();

        let source = ProviderStatusAdapter::new(
            provider.clone(),
            logger.clone(),
            clock.clone(),
            messages.clone(),
        );
        let engine = Arc::new(
            ReconciliationEngine::new(
                repository.clone(),
                Arc::new(source),
                logger.clone(),
                clock.clone(),
                schedule,
                messages.clone(),
            )
            .unwrap(),
        );
        let controller =
            RunController::new(engine.clone(), logger.clone(), clock.clone(), messages);

        Self {
            repository,
            provider,
            logger,
            clock,
            engine,
            controller,
        }
    }
}
