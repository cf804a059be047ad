//! Poll source for metric readings.

use async_trait::async_trait;
use aura_core::{FeedError, PartialReading};
use std::time::Duration;

pub const STATUS_PATH: &str = "/api/quantum/status";

/// Something the feed can poll for the current reading.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn poll(&self) -> Result<PartialReading, FeedError>;
}

/// Polls the remote status endpoint over HTTP.
#[derive(Clone)]
pub struct HttpStatusSource {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpStatusSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FeedError> {
        let endpoint = format!("{}{}", base_url.trim_end_matches('/'), STATUS_PATH);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FeedError::Poll {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn poll(&self) -> Result<PartialReading, FeedError> {
        let poll_error = |reason: String| FeedError::Poll {
            endpoint: self.endpoint.clone(),
            reason,
        };
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| poll_error(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(poll_error(format!("HTTP {}", status.as_u16())));
        }
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FeedError::Malformed { reason: e.to_string() })?;
        Ok(PartialReading::from_value(&payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_from_base() {
        let source = HttpStatusSource::new("http://localhost:3000/", Duration::from_secs(5)).unwrap();
        assert_eq!(source.endpoint(), "http://localhost:3000/api/quantum/status");
    }

    #[tokio::test]
    async fn test_unreachable_source_is_poll_error() {
        let source = HttpStatusSource::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        assert!(matches!(source.poll().await, Err(FeedError::Poll { .. })));
    }
}
