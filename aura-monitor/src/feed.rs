//! Background feed that keeps a [`MetricsMonitor`] current.
//!
//! The feed subscribes to the push channel once at start, giving up after the
//! connect timeout or on shutdown. While connected it
//! waits on pushed readings; once the channel is unavailable or drops it
//! polls the status source on a fixed interval instead. Shutdown stops
//! whichever path is active.

use crate::monitor::MetricsMonitor;
use crate::push::PushChannel;
use crate::source::StatusSource;
use aura_core::{FeedError, PartialReading};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    /// Receiving pushed readings.
    Connected,
    /// Polling.
    Disconnected,
}

pub struct MetricsFeed {
    monitor: Arc<MetricsMonitor>,
    source: Arc<dyn StatusSource>,
    push: Option<Box<dyn PushChannel>>,
    poll_interval: Duration,
    connect_timeout: Duration,
}

/// Handle to a running feed task.
pub struct FeedHandle {
    shutdown: watch::Sender<bool>,
    state: watch::Receiver<FeedState>,
    task: JoinHandle<()>,
}

impl FeedHandle {
    pub fn state(&self) -> FeedState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn state_changes(&self) -> watch::Receiver<FeedState> {
        self.state.clone()
    }

    /// Stop the feed and wait for the task to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Metrics feed task ended abnormally");
        }
    }
}

enum Step {
    Shutdown,
    Pushed(Option<Result<PartialReading, FeedError>>),
    Tick,
}

impl MetricsFeed {
    pub fn new(monitor: Arc<MetricsMonitor>, source: Arc<dyn StatusSource>) -> Self {
        Self {
            monitor,
            source,
            push: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_push(mut self, push: Box<dyn PushChannel>) -> Self {
        self.push = Some(push);
        self
    }

    /// A zero interval is raised to one millisecond.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// How long the initial push connect may take before polling starts.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn spawn(self) -> FeedHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(FeedState::Disconnected);
        let task = tokio::spawn(self.run(shutdown_rx, state_tx));
        FeedHandle {
            shutdown: shutdown_tx,
            state: state_rx,
            task,
        }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>, state: watch::Sender<FeedState>) {
        let MetricsFeed {
            monitor,
            source,
            push,
            poll_interval,
            connect_timeout,
        } = self;
        let mut push = match push {
            Some(mut channel) => {
                let connected = tokio::select! {
                    _ = shutdown.changed() => {
                        tracing::debug!("Metrics feed stopped while connecting");
                        return;
                    }
                    result = tokio::time::timeout(connect_timeout, channel.connect()) => result,
                };
                match connected {
                    Ok(Ok(())) => {
                        tracing::info!("Metrics push channel connected");
                        state.send_replace(FeedState::Connected);
                        Some(channel)
                    }
                    Ok(Err(e)) => {
                        tracing::info!(error = %e, "Push channel unavailable, polling");
                        None
                    }
                    Err(_) => {
                        tracing::info!(
                            timeout_ms = connect_timeout.as_millis() as u64,
                            "Push channel connect timed out, polling"
                        );
                        None
                    }
                }
            }
            None => None,
        };

        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let step = match push.as_mut() {
                Some(channel) => tokio::select! {
                    _ = shutdown.changed() => Step::Shutdown,
                    pushed = channel.next_reading() => Step::Pushed(pushed),
                },
                None => tokio::select! {
                    _ = shutdown.changed() => Step::Shutdown,
                    _ = ticker.tick() => Step::Tick,
                },
            };

            match step {
                Step::Shutdown => break,
                Step::Pushed(Some(Ok(partial))) => {
                    monitor.record(partial.or_placeholder()).await;
                }
                Step::Pushed(Some(Err(FeedError::Malformed { reason }))) => {
                    tracing::debug!(reason = %reason, "Skipping malformed pushed reading");
                }
                Step::Pushed(Some(Err(e))) => {
                    tracing::info!(error = %e, "Push channel lost, falling back to polling");
                    push = None;
                    state.send_replace(FeedState::Disconnected);
                    ticker.reset_immediately();
                }
                Step::Pushed(None) => {
                    tracing::info!("Push channel closed, falling back to polling");
                    push = None;
                    state.send_replace(FeedState::Disconnected);
                    ticker.reset_immediately();
                }
                Step::Tick => poll_once(&monitor, source.as_ref()).await,
            }
        }
        tracing::debug!("Metrics feed stopped");
    }
}

async fn poll_once(monitor: &MetricsMonitor, source: &dyn StatusSource) {
    match source.poll().await {
        Ok(partial) => monitor.record(partial.or_placeholder()).await,
        Err(e) => tracing::debug!(error = %e, "Metrics poll failed, skipping"),
    }
}
