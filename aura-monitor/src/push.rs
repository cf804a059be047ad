//! Push channel for metric readings.

use async_trait::async_trait;
use aura_core::{FeedError, PartialReading};
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub const WS_METRICS_PATH: &str = "/ws/metrics";

/// A persistent connection that emits readings.
#[async_trait]
pub trait PushChannel: Send {
    async fn connect(&mut self) -> Result<(), FeedError>;

    /// Next reading. `None` once the connection is gone; a malformed
    /// message yields `Some(Err(FeedError::Malformed))` and the channel
    /// stays usable.
    async fn next_reading(&mut self) -> Option<Result<PartialReading, FeedError>>;
}

/// `ws(s)://host/ws/metrics` for an `http(s)://host` base URL.
pub fn ws_endpoint_for(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };
    format!("{}{}", base, WS_METRICS_PATH)
}

/// Parse one pushed payload. Payloads without any channel are rejected.
pub fn parse_push_payload(text: &str) -> Result<PartialReading, FeedError> {
    let payload: serde_json::Value =
        serde_json::from_str(text).map_err(|e| FeedError::Malformed { reason: e.to_string() })?;
    let partial = PartialReading::from_value(&payload);
    if partial.has_any() {
        Ok(partial)
    } else {
        Err(FeedError::Malformed {
            reason: "no metric channels in payload".to_string(),
        })
    }
}

/// [`PushChannel`] over a WebSocket.
pub struct WsPushChannel {
    url: String,
    stream: Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
}

impl WsPushChannel {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stream: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PushChannel for WsPushChannel {
    async fn connect(&mut self) -> Result<(), FeedError> {
        let (stream, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| FeedError::Connect {
                endpoint: self.url.clone(),
                reason: e.to_string(),
            })?;
        self.stream = Some(stream);
        Ok(())
    }

    async fn next_reading(&mut self) -> Option<Result<PartialReading, FeedError>> {
        let stream = self.stream.as_mut()?;
        loop {
            match stream.next().await? {
                Ok(Message::Text(text)) => return Some(parse_push_payload(&text)),
                Ok(Message::Binary(bytes)) => {
                    return Some(match std::str::from_utf8(&bytes) {
                        Ok(text) => parse_push_payload(text),
                        Err(e) => Err(FeedError::Malformed { reason: e.to_string() }),
                    })
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(url = %self.url, error = %e, "Push channel transport error");
                    break;
                }
            }
        }
        self.stream = None;
        None
    }
}
