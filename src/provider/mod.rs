//! # Delivery Provider Integration
//!
//! The provider collaborator reports the current delivery status of orders.
//! Implementations declare which delivery services they cover and answer one
//! batched request per round; the transport behind that request is their own
//! business.

pub mod http;

use crate::models::{ProviderStatuses, StaleOrderRecord};
use async_trait::async_trait;
use thiserror::Error;

pub use http::{HttpDeliveryProvider, HttpProviderConfig};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("Request to {provider} failed: {reason}")]
    Transport { provider: String, reason: String },
    #[error("{provider} responded with HTTP {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },
    #[error("Could not decode {provider} response: {reason}")]
    Decode { provider: String, reason: String },
    #[error("{provider} client configuration is invalid: {reason}")]
    Configuration { provider: String, reason: String },
}

impl ProviderError {
    pub fn provider(&self) -> &str {
        match self {
            ProviderError::Transport { provider, .. }
            | ProviderError::Status { provider, .. }
            | ProviderError::Decode { provider, .. }
            | ProviderError::Configuration { provider, .. } => provider,
        }
    }
}

#[async_trait]
pub trait DeliveryProvider: Send + Sync {
    /// Name used in log messages and error reports
    fn name(&self) -> &str;

    /// Delivery-service identifiers this provider can answer for; membership
    /// is tested case-insensitively.
    fn supported_delivery_service_keys(&self) -> &[String];

    fn supports(&self, delivery_service_id: &str) -> bool {
        let wanted = delivery_service_id.to_lowercase();
        self.supported_delivery_service_keys()
            .iter()
            .any(|key| key.to_lowercase() == wanted)
    }

    /// Fetch current statuses for a batch of orders.
    ///
    /// The response is keyed by delivery-service identifier. It may omit orders
    /// or contain several statuses for one order.
    async fn fetch_statuses(
        &self,
        records: &[StaleOrderRecord],
        include_already_delivered: bool,
    ) -> Result<ProviderStatuses, ProviderError>;
}
