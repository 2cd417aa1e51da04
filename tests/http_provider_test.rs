//! Integration tests for the HTTP delivery provider using wiremock.

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use status_reconciler::error::{ErrorKind, ReconcilerError};
use status_reconciler::models::StaleOrderRecord;
use status_reconciler::provider::{
    DeliveryProvider, HttpDeliveryProvider, HttpProviderConfig, ProviderError,
};

// =============================================================================
// Test Helpers
// =============================================================================

fn create_config(base_url: &str) -> HttpProviderConfig {
    HttpProviderConfig {
        name: "dostavim".to_string(),
        base_url: base_url.to_string(),
        timeout_ms: 2000,
        api_key: None,
        supported_delivery_services: vec!["dsA".to_string()],
    }
}

fn batch() -> Vec<StaleOrderRecord> {
    vec![StaleOrderRecord::new(55, "dsA"), StaleOrderRecord::new(77, "dsA")]
}

// =============================================================================
// Request / response
// =============================================================================

#[tokio::test]
async fn test_fetch_statuses_decodes_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/order-statuses"))
        .and(body_json(json!({
            "include_delivered": false,
            "orders": [
                { "order_id": 55, "delivery_service_id": "dsA" },
                { "order_id": 77, "delivery_service_id": "dsA" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statuses": {
                "dsA": [{
                    "order_id": 55,
                    "status_code": "delivered",
                    "status_name_for_dictionary": "123",
                    "last_status_sync_time": "2026-03-01T10:00:00Z",
                    "delivery_service_order_id": "DS-55",
                    "city_name": "Berlin"
                }]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = HttpDeliveryProvider::new(create_config(&server.uri())).unwrap();
    let statuses = provider.fetch_statuses(&batch(), false).await.unwrap();

    let results = &statuses["dsA"];
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].order_id, 55);
    assert_eq!(results[0].status_code, "delivered");
    assert_eq!(results[0].delivery_service_order_id.as_deref(), Some("DS-55"));
    assert_eq!(results[0].city_name.as_deref(), Some("Berlin"));
    assert!(results[0].return_order_number.is_none());
    assert!(results[0].last_status_sync_time.is_some());
}

#[tokio::test]
async fn test_api_key_header_is_sent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/order-statuses"))
        .and(header("X-API-Key", "secret-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "statuses": {} })))
        .expect(1)
        .mount(&server)
        .await;

    let config = HttpProviderConfig {
        api_key: Some("secret-key".to_string()),
        ..create_config(&server.uri())
    };
    let provider = HttpDeliveryProvider::new(config).unwrap();

    let statuses = provider.fetch_statuses(&batch(), true).await.unwrap();
    assert!(statuses.is_empty());
}

#[tokio::test]
async fn test_missing_statuses_object_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/order-statuses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let provider = HttpDeliveryProvider::new(create_config(&server.uri())).unwrap();
    assert!(provider.fetch_statuses(&batch(), false).await.unwrap().is_empty());
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_server_error_is_status_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/order-statuses"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let provider = HttpDeliveryProvider::new(create_config(&server.uri())).unwrap();
    let err = provider.fetch_statuses(&batch(), false).await.unwrap_err();

    assert_eq!(
        err,
        ProviderError::Status {
            provider: "dostavim".to_string(),
            status: 503,
            body: "maintenance".to_string(),
        }
    );
    assert_eq!(ReconcilerError::from(err).kind(), ErrorKind::RemoteService);
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/order-statuses"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let provider = HttpDeliveryProvider::new(create_config(&server.uri())).unwrap();
    let err = provider.fetch_statuses(&batch(), false).await.unwrap_err();

    assert!(matches!(err, ProviderError::Decode { .. }));
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/order-statuses"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "statuses": {} }))
                .set_delay(std::time::Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let config = HttpProviderConfig {
        timeout_ms: 50,
        ..create_config(&server.uri())
    };
    let provider = HttpDeliveryProvider::new(config).unwrap();
    let err = provider.fetch_statuses(&batch(), false).await.unwrap_err();

    assert!(matches!(err, ProviderError::Transport { .. }));
}

#[tokio::test]
async fn test_unreachable_provider_is_transport_error() {
    // Nothing listens on port 9 of localhost in the test environment.
    let provider = HttpDeliveryProvider::new(create_config("http://127.0.0.1:9")).unwrap();
    let err = provider.fetch_statuses(&batch(), false).await.unwrap_err();

    assert!(matches!(err, ProviderError::Transport { .. }));
    assert_eq!(err.provider(), "dostavim");
}
