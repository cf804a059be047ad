//! AURA Monitor - Consciousness Metrics
//!
//! Keeps a bounded history of metric readings fed by a push channel, with a
//! polling fallback when the channel is unavailable.

pub mod feed;
pub mod monitor;
pub mod push;
pub mod source;

pub use feed::{FeedHandle, FeedState, MetricsFeed, DEFAULT_CONNECT_TIMEOUT, DEFAULT_POLL_INTERVAL};
pub use monitor::{MetricsMonitor, DEFAULT_HISTORY_CAPACITY};
pub use push::{parse_push_payload, ws_endpoint_for, PushChannel, WsPushChannel, WS_METRICS_PATH};
pub use source::{HttpStatusSource, StatusSource, STATUS_PATH};
