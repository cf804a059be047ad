//! Remote execution backend.

use async_trait::async_trait;
use aura_core::DispatchError;
use serde_json::Value;
use std::time::Duration;

/// JSON-over-HTTP style execution service. Paths are relative, e.g.
/// `/api/quantum/jobs`.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    async fn get(&self, path: &str) -> Result<Value, DispatchError>;

    async fn post(&self, path: &str, body: Value) -> Result<Value, DispatchError>;
}

/// [`ExecutionBackend`] over reqwest.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::Backend {
                endpoint: base_url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send_error(&self, path: &str, err: reqwest::Error) -> DispatchError {
        if err.is_timeout() {
            DispatchError::Timeout {
                endpoint: path.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            DispatchError::Backend {
                endpoint: path.to_string(),
                reason: err.to_string(),
            }
        }
    }

    async fn parse_response(&self, path: &str, response: reqwest::Response) -> Result<Value, DispatchError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.send_error(path, e))?;
        if !status.is_success() {
            return Err(DispatchError::Backend {
                endpoint: path.to_string(),
                reason: format!("HTTP {}: {}", status.as_u16(), error_message(&text)),
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| DispatchError::Backend {
            endpoint: path.to_string(),
            reason: format!("invalid JSON response: {}", e),
        })
    }
}

/// Pull `error` out of a JSON error body, else return the body as is.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl ExecutionBackend for HttpBackend {
    async fn get(&self, path: &str) -> Result<Value, DispatchError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| self.send_error(path, e))?;
        self.parse_response(path, response).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, DispatchError> {
        let response = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.send_error(path, e))?;
        self.parse_response(path, response).await
    }
}

/// False only when the payload explicitly reports `"success": false`.
pub fn reports_success(payload: &Value) -> bool {
    payload.get("success").and_then(Value::as_bool) != Some(false)
}

/// Impact reported by the backend, if any.
pub fn reported_impact(payload: &Value) -> Option<f64> {
    payload
        .get("impact_score")
        .or_else(|| payload.get("impact"))
        .and_then(Value::as_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_message_prefers_error_field() {
        assert_eq!(error_message(r#"{"error":"backend offline"}"#), "backend offline");
        assert_eq!(error_message("plain text"), "plain text");
    }

    #[test]
    fn test_reports_success_only_fails_on_explicit_false() {
        assert!(reports_success(&json!({"job_id": "j1"})));
        assert!(reports_success(&json!({"success": true})));
        assert!(reports_success(&Value::Null));
        assert!(!reports_success(&json!({"success": false})));
    }

    #[test]
    fn test_reported_impact() {
        assert_eq!(reported_impact(&json!({"impact_score": 7.5})), Some(7.5));
        assert_eq!(reported_impact(&json!({"impact": 3})), Some(3.0));
        assert_eq!(reported_impact(&json!({})), None);
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let backend = HttpBackend::new("http://localhost:3000/", Duration::from_secs(1)).unwrap();
        assert_eq!(backend.url("/api/quantum/status"), "http://localhost:3000/api/quantum/status");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_backend_error() {
        let backend = HttpBackend::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = backend.get("/api/quantum/status").await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Backend { ref endpoint, .. } if endpoint == "/api/quantum/status"
        ));
    }
}
