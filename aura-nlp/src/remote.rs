//! Remote intent classification fallback.

use async_trait::async_trait;
use aura_core::{ClassifierError, Entities};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Answer from a remote classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteIntent {
    pub action: String,
    pub confidence: f64,
    pub entities: Entities,
}

/// A classifier reached over the network.
#[async_trait]
pub trait RemoteClassifier: Send + Sync {
    async fn classify(&self, command: &str) -> Result<RemoteIntent, ClassifierError>;
}

#[derive(Debug, Serialize)]
struct ParseRequest<'a> {
    command: &'a str,
}

#[derive(Debug, Deserialize)]
struct ParseResponse {
    intent: ParsedIntent,
    #[serde(default)]
    entities: Entities,
}

#[derive(Debug, Deserialize)]
struct ParsedIntent {
    action: String,
    confidence: f64,
}

/// Posts `{command}` to `{base_url}/api/nlp2/parse`.
#[derive(Clone)]
pub struct HttpRemoteClassifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRemoteClassifier {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifierError::RequestFailed {
                status: 0,
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/nlp2/parse", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteClassifier for HttpRemoteClassifier {
    async fn classify(&self, command: &str) -> Result<RemoteIntent, ClassifierError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ParseRequest { command })
            .send()
            .await
            .map_err(|e| ClassifierError::RequestFailed {
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClassifierError::RequestFailed {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ClassifierError::MalformedResponse {
                reason: e.to_string(),
            })?;
        parse_response(&body)
    }
}

fn parse_response(body: &str) -> Result<RemoteIntent, ClassifierError> {
    let parsed: ParseResponse =
        serde_json::from_str(body).map_err(|e| ClassifierError::MalformedResponse {
            reason: e.to_string(),
        })?;
    if parsed.intent.action.trim().is_empty() {
        return Err(ClassifierError::MalformedResponse {
            reason: "empty action".to_string(),
        });
    }
    if !(0.0..=1.0).contains(&parsed.intent.confidence) {
        return Err(ClassifierError::MalformedResponse {
            reason: format!("confidence {} outside [0, 1]", parsed.intent.confidence),
        });
    }
    Ok(RemoteIntent {
        action: parsed.intent.action,
        confidence: parsed.intent.confidence,
        entities: parsed.entities,
    })
}
