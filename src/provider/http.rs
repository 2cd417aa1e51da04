//! # HTTP Delivery Provider
//!
//! JSON-over-HTTP client for a delivery-service integration that answers
//! status requests in batches.
//!
//! ```text
//! POST {base_url}/order-statuses
//! { "include_delivered": false,
//!   "orders": [ { "order_id": 55, "delivery_service_id": "dsA" } ] }
//!
//! 200 OK
//! { "statuses": { "dsA": [ { "order_id": 55, "status_code": "delivered", ... } ] } }
//! ```

use super::{DeliveryProvider, ProviderError};
use crate::models::{ProviderStatuses, StaleOrderRecord};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, instrument};

const STATUS_ENDPOINT: &str = "order-statuses";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpProviderConfig {
    /// Name used in logs and error reports
    pub name: String,
    pub base_url: String,
    pub timeout_ms: u64,
    /// Optional API key sent as `X-API-Key`
    pub api_key: Option<String>,
    pub supported_delivery_services: Vec<String>,
}

impl Default for HttpProviderConfig {
    fn default() -> Self {
        Self {
            name: "delivery-integration".to_string(),
            base_url: "http://localhost:8080".to_string(),
            timeout_ms: 30000,
            api_key: None,
            supported_delivery_services: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusRequest<'a> {
    include_delivered: bool,
    orders: Vec<OrderRef<'a>>,
}

#[derive(Debug, Serialize)]
struct OrderRef<'a> {
    order_id: i64,
    delivery_service_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    statuses: Option<ProviderStatuses>,
}

#[derive(Clone)]
pub struct HttpDeliveryProvider {
    client: Client,
    endpoint: Url,
    config: HttpProviderConfig,
}

impl std::fmt::Debug for HttpDeliveryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDeliveryProvider")
            .field("name", &self.config.name)
            .field("endpoint", &self.endpoint.as_str())
            .field("timeout_ms", &self.config.timeout_ms)
            .field("api_key_configured", &self.config.api_key.is_some())
            .finish()
    }
}

impl HttpDeliveryProvider {
    pub fn new(config: HttpProviderConfig) -> Result<Self, ProviderError> {
        let configuration_error = |reason: String| ProviderError::Configuration {
            provider: config.name.clone(),
            reason,
        };

        let endpoint = Url::parse(&format!(
            "{}/{STATUS_ENDPOINT}",
            config.base_url.trim_end_matches('/')
        ))
        .map_err(|e| configuration_error(format!("Invalid base URL: {e}")))?;

        let mut client_builder = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(format!("status-reconciler/{}", env!("CARGO_PKG_VERSION")));

        if let Some(api_key) = config.api_key.as_deref().filter(|key| !key.is_empty()) {
            let mut default_headers = reqwest::header::HeaderMap::new();
            default_headers.insert(
                "X-API-Key",
                api_key
                    .parse()
                    .map_err(|e| configuration_error(format!("Invalid API key: {e}")))?,
            );
            client_builder = client_builder.default_headers(default_headers);
            debug!("Configured API key authentication");
        }

        let client = client_builder
            .build()
            .map_err(|e| configuration_error(format!("Failed to create HTTP client: {e}")))?;

        info!(
            provider = %config.name,
            endpoint = %endpoint,
            timeout_ms = config.timeout_ms,
            supported = config.supported_delivery_services.len(),
            "Created delivery provider client"
        );

        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl DeliveryProvider for HttpDeliveryProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn supported_delivery_service_keys(&self) -> &[String] {
        &self.config.supported_delivery_services
    }

    #[instrument(skip(self, records), fields(provider = %self.config.name, orders = records.len()))]
    async fn fetch_statuses(
        &self,
        records: &[StaleOrderRecord],
        include_already_delivered: bool,
    ) -> Result<ProviderStatuses, ProviderError> {
        let request = StatusRequest {
            include_delivered: include_already_delivered,
            orders: records
                .iter()
                .map(|record| OrderRef {
                    order_id: record.order_id,
                    delivery_service_id: &record.delivery_service_id,
                })
                .collect(),
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Status request failed");
                ProviderError::Transport {
                    provider: self.config.name.clone(),
                    reason: e.to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %body, "Status request rejected");
            return Err(ProviderError::Status {
                provider: self.config.name.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let payload = response
            .json::<StatusResponse>()
            .await
            .map_err(|e| ProviderError::Decode {
                provider: self.config.name.clone(),
                reason: e.to_string(),
            })?;

        let statuses = payload.statuses.unwrap_or_default();
        debug!(
            delivery_services = statuses.len(),
            statuses = statuses.values().map(Vec::len).sum::<usize>(),
            "Received provider statuses"
        );

        Ok(statuses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> HttpProviderConfig {
        HttpProviderConfig {
            base_url: base_url.to_string(),
            supported_delivery_services: vec!["dsA".to_string(), "DSB".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_endpoint_tolerates_trailing_slash() {
        let provider = HttpDeliveryProvider::new(config("http://integration:9000/api/")).unwrap();
        assert_eq!(
            provider.endpoint().as_str(),
            "http://integration:9000/api/order-statuses"
        );
    }

    #[test]
    fn test_invalid_base_url_is_configuration_error() {
        let err = HttpDeliveryProvider::new(config("not a url")).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration { .. }));
    }

    #[test]
    fn test_supported_keys_are_case_insensitive() {
        let provider = HttpDeliveryProvider::new(config("http://localhost:9000")).unwrap();
        assert!(provider.supports("DSA"));
        assert!(provider.supports("dsb"));
        assert!(!provider.supports("dsC"));
    }

    #[test]
    fn test_request_body_shape() {
        let records = vec![StaleOrderRecord::new(55, "dsA")];
        let request = StatusRequest {
            include_delivered: false,
            orders: records
                .iter()
                .map(|r| OrderRef {
                    order_id: r.order_id,
                    delivery_service_id: &r.delivery_service_id,
                })
                .collect(),
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "include_delivered": false,
                "orders": [{ "order_id": 55, "delivery_service_id": "dsA" }]
            })
        );
    }

    #[test]
    fn test_null_statuses_decode_as_empty() {
        let response: StatusResponse = serde_json::from_str(r#"{"statuses": null}"#).unwrap();
        assert!(response.statuses.unwrap_or_default().is_empty());
    }
}
