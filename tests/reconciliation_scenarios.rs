//! End-to-end runs over in-memory collaborators
//!
//! Each test wires the real adapter, engine and controller against the
//! scripted provider and the in-memory repository.

mod common;

use common::{mapping_row, schedule, standard_mapping, Harness};
use std::time::Duration;

use status_reconciler::clock::Clock;
use status_reconciler::config::MessageTemplates;
use status_reconciler::constants::{LogEventType, LogLevel};
use status_reconciler::dictionary::StatusDictionary;
use status_reconciler::models::{ProviderStatusResult, StaleOrderRecord, UnresolvedStatus};
use status_reconciler::reconciliation::{ProviderStatusAdapter, StatusSource};
use status_reconciler::test_helpers::{
    FixedClock, InMemoryStatusRepository, RecordingEventLogger, ScriptedProvider,
};
use std::sync::Arc;

fn repository_with(records: Vec<StaleOrderRecord>) -> InMemoryStatusRepository {
    InMemoryStatusRepository::default()
        .with_mapping_rows(standard_mapping())
        .with_stale_records(records)
}

fn delivered(order_id: i64) -> ProviderStatusResult {
    ProviderStatusResult::new(order_id, "delivered", "123")
}

// =============================================================================
// Single round scenarios
// =============================================================================

#[tokio::test]
async fn test_delivered_status_is_resolved_and_persisted() {
    let provider = ScriptedProvider::new(["dsA"]);
    provider.push_response([("dsA", vec![delivered(55)])]);
    let harness = Harness::new(repository_with(vec![StaleOrderRecord::new(55, "dsA")]), provider);

    harness.controller.execute(true).await;

    let saved = harness.repository.saved_resolved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].len(), 1);
    assert_eq!(saved[0][0].order_id, 55);
    assert_eq!(saved[0][0].delivery_service_status_id, 9);
    assert_eq!(saved[0][0].status_id, 2);
    assert!(harness.repository.saved_unresolved().is_empty());
    assert_eq!(harness.provider.requests().len(), 1);
    assert!(harness.logger.events().is_empty());
}

#[tokio::test]
async fn test_missing_status_is_recorded_as_failure() {
    let provider = ScriptedProvider::new(["dsA"]);
    provider.push_response([("dsA", vec![delivered(55)])]);
    let harness = Harness::new(
        repository_with(vec![
            StaleOrderRecord::new(55, "dsA"),
            StaleOrderRecord::new(77, "dsA"),
        ]),
        provider,
    );

    harness.controller.execute(false).await;

    assert_eq!(
        harness.repository.saved_unresolved(),
        vec![vec![UnresolvedStatus {
            order_id: 77,
            failed_date_time: harness.clock.now(),
        }]]
    );

    let events = harness.logger.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, LogEventType::StatusRequestFailed);
    assert_eq!(events[0].level, LogLevel::Error);
    assert_eq!(events[0].order_id, Some(77));
}

#[tokio::test]
async fn test_primary_round_skips_orders_that_already_failed() {
    // Provider answers with nothing, so both orders stay unresolved.
    let harness = Harness::new(
        repository_with(vec![
            StaleOrderRecord::new(1, "dsA").with_previous_outcome(true),
            StaleOrderRecord::new(2, "dsA").with_previous_outcome(false),
        ]),
        ScriptedProvider::new(["dsA"]),
    );

    harness.controller.execute(false).await;

    let saved = harness.repository.saved_unresolved();
    assert_eq!(saved.len(), 1);
    let ids: Vec<i64> = saved[0].iter().map(|s| s.order_id).collect();
    assert_eq!(ids, vec![1]);
}

#[tokio::test]
async fn test_unmapped_status_is_logged_with_dictionary_key() {
    let provider = ScriptedProvider::new(["dsA"]);
    provider.push_response([(
        "dsA",
        vec![ProviderStatusResult::new(55, "returned", "404")],
    )]);
    let harness = Harness::new(repository_with(vec![StaleOrderRecord::new(55, "dsA")]), provider);

    harness.controller.execute(false).await;

    let events = harness
        .logger
        .events_of(LogEventType::GetMapStatusesDictionaryFailed);
    assert_eq!(events.len(), 1);
    assert!(events[0].message.ends_with("dsA: returned404dsa"));
    assert_eq!(harness.repository.saved_unresolved()[0][0].order_id, 55);
}

#[tokio::test]
async fn test_empty_batch_only_warns() {
    let harness = Harness::new(repository_with(Vec::new()), ScriptedProvider::new(["dsA"]));

    harness.controller.execute(true).await;

    assert!(harness.provider.requests().is_empty());
    assert!(harness.repository.saved_resolved().is_empty());
    assert!(harness.repository.saved_unresolved().is_empty());
    assert_eq!(harness.repository.mapping_row_loads(), 0);

    let events = harness.logger.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, LogEventType::ProcessFailed);
    assert_eq!(events[0].level, LogLevel::Warning);
    assert_eq!(events[0].message, MessageTemplates::default().no_orders);
}

#[tokio::test]
async fn test_status_outside_requested_batch_is_persisted() {
    let provider = ScriptedProvider::new(["dsA"]);
    provider.push_response([("dsA", vec![delivered(55), delivered(999)])]);
    let harness = Harness::new(repository_with(vec![StaleOrderRecord::new(55, "dsA")]), provider);

    harness.controller.execute(true).await;

    let saved: Vec<i64> = harness.repository.saved_resolved()[0]
        .iter()
        .map(|s| s.order_id)
        .collect();
    assert_eq!(saved, vec![55, 999]);
}

#[tokio::test]
async fn test_include_delivered_flag_reaches_provider() {
    let provider = Arc::new(ScriptedProvider::new(["dsA"]));
    let source = ProviderStatusAdapter::new(
        provider.clone(),
        Arc::new(RecordingEventLogger::default()),
        Arc::new(FixedClock::default()),
        MessageTemplates::default(),
    )
    .with_include_delivered(true);
    let dictionary = StatusDictionary::build(standard_mapping()).unwrap();

    source
        .resolve(&[StaleOrderRecord::new(1, "dsA")], &dictionary)
        .await
        .unwrap();

    assert!(provider.requests()[0].include_already_delivered);
}

#[tokio::test]
async fn test_resolving_twice_yields_the_same_statuses() {
    let provider = Arc::new(ScriptedProvider::new(["dsA"]));
    let response = vec![
        delivered(1),
        ProviderStatusResult::new(2, "IN_TRANSIT", "000"),
    ];
    provider.push_response([("dsA", response.clone())]);
    provider.push_response([("dsA", response)]);

    let source = ProviderStatusAdapter::new(
        provider,
        Arc::new(RecordingEventLogger::default()),
        Arc::new(FixedClock::default()),
        MessageTemplates::default(),
    );
    let dictionary = StatusDictionary::build(standard_mapping()).unwrap();
    let records = vec![StaleOrderRecord::new(1, "dsA"), StaleOrderRecord::new(2, "dsA")];

    let first = source.resolve(&records, &dictionary).await.unwrap();
    let second = source.resolve(&records, &dictionary).await.unwrap();

    assert_eq!(first.resolved.len(), 2);
    assert_eq!(first, second);
}

// =============================================================================
// Retry protocol
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_retry_rounds_are_bounded_by_multiplicity() {
    let harness = Harness::with_schedule(
        repository_with(vec![StaleOrderRecord::new(1, "dsA")]),
        ScriptedProvider::new(["dsA"]),
        schedule(400, 4),
    );

    let started = tokio::time::Instant::now();
    harness.controller.execute(true).await;

    assert_eq!(harness.provider.requests().len(), 4);
    // Only the primary round records failures.
    assert_eq!(harness.repository.saved_unresolved().len(), 1);
    assert_eq!(harness.repository.saved_resolved().len(), 4);
    assert!(started.elapsed() >= Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn test_retry_loop_stops_once_everything_resolves() {
    let provider = ScriptedProvider::new(["dsA"]);
    provider.push_response([("dsA", Vec::new())]);
    provider.push_response([("dsA", vec![delivered(1)])]);
    let harness = Harness::new(repository_with(vec![StaleOrderRecord::new(1, "dsA")]), provider);

    harness.controller.execute(true).await;

    assert_eq!(harness.provider.requests().len(), 2);
    let resolved = harness.repository.saved_resolved();
    assert_eq!(resolved.len(), 2);
    assert!(resolved[0].is_empty());
    assert_eq!(resolved[1][0].order_id, 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_rounds_request_only_the_carried_subset() {
    let provider = ScriptedProvider::new(["dsA"]);
    provider.push_response([("dsA", vec![delivered(1)])]);
    provider.push_response([("dsA", vec![delivered(2)])]);
    provider.push_response([("dsA", vec![delivered(3)])]);
    let harness = Harness::new(
        repository_with(vec![
            StaleOrderRecord::new(1, "dsA"),
            StaleOrderRecord::new(2, "dsA"),
            StaleOrderRecord::new(3, "dsA"),
        ]),
        provider,
    );

    harness.controller.execute(true).await;

    assert_eq!(
        harness.provider.requested_order_ids(),
        vec![vec![1, 2, 3], vec![2, 3], vec![3]]
    );
    let failures: Vec<i64> = harness.repository.saved_unresolved()[0]
        .iter()
        .map(|s| s.order_id)
        .collect();
    assert_eq!(failures, vec![2, 3]);
}

#[tokio::test(start_paused = true)]
async fn test_extra_rounds_disabled_runs_primary_round_only() {
    let harness = Harness::new(
        repository_with(vec![StaleOrderRecord::new(1, "dsA")]),
        ScriptedProvider::new(["dsA"]),
    );

    harness.controller.execute(false).await;

    assert_eq!(harness.provider.requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_multiplicity_of_one_allows_no_retries() {
    let harness = Harness::with_schedule(
        repository_with(vec![StaleOrderRecord::new(1, "dsA")]),
        ScriptedProvider::new(["dsA"]),
        schedule(400, 1),
    );

    harness.controller.execute(true).await;

    assert_eq!(harness.provider.requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_orders_are_retried_without_provider_calls() {
    let provider = ScriptedProvider::new(["dsA"]);
    provider.push_response([("dsA", vec![delivered(1)])]);
    let harness = Harness::new(
        repository_with(vec![
            StaleOrderRecord::new(1, "dsA"),
            StaleOrderRecord::new(2, "dsZ"),
        ]),
        provider,
    );

    harness.controller.execute(true).await;

    assert_eq!(harness.provider.requested_order_ids(), vec![vec![1]]);
    assert_eq!(harness.repository.saved_unresolved()[0][0].order_id, 2);
    // Unsupported orders are a business outcome, not a logged error.
    assert!(harness.logger.events().is_empty());
}

#[tokio::test]
async fn test_dictionary_is_built_once_per_engine() {
    let provider = ScriptedProvider::new(["dsA"]);
    provider.push_response([("dsA", vec![delivered(1)])]);
    provider.push_response([("dsA", vec![delivered(1)])]);
    let harness = Harness::new(
        InMemoryStatusRepository::default()
            .with_mapping_rows(vec![mapping_row(9, 2, "delivered", "123", "dsA")])
            .with_stale_records(vec![StaleOrderRecord::new(1, "dsA")]),
        provider,
    );

    harness.controller.execute(true).await;
    harness.controller.execute(true).await;

    assert_eq!(harness.repository.stale_record_loads(), 2);
    assert_eq!(harness.repository.mapping_row_loads(), 1);
    assert!(harness.engine.is_dictionary_loaded());
}
