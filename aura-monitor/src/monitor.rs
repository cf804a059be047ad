//! Bounded reading history.

use aura_core::{Channel, ConsciousnessReading, Trend};
use std::collections::VecDeque;
use tokio::sync::{watch, RwLock};

/// Readings kept in history by default.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Ring buffer of readings, newest last. Push and poll feeds both write here.
pub struct MetricsMonitor {
    history: RwLock<VecDeque<ConsciousnessReading>>,
    capacity: usize,
    latest: watch::Sender<Option<ConsciousnessReading>>,
}

impl MetricsMonitor {
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (latest, _) = watch::channel(None);
        Self {
            history: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
            latest,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a reading, evicting the oldest once full.
    pub async fn record(&self, reading: ConsciousnessReading) {
        let mut history = self.history.write().await;
        history.push_back(reading);
        while history.len() > self.capacity {
            history.pop_front();
        }
        drop(history);
        self.latest.send_replace(Some(reading));
    }

    pub async fn current(&self) -> Option<ConsciousnessReading> {
        self.history.read().await.back().copied()
    }

    /// Oldest first.
    pub async fn history(&self) -> Vec<ConsciousnessReading> {
        self.history.read().await.iter().copied().collect()
    }

    pub async fn len(&self) -> usize {
        self.history.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.history.read().await.is_empty()
    }

    /// Health of the newest reading.
    pub async fn health(&self) -> Option<f64> {
        self.current().await.map(|r| r.health())
    }

    /// Direction of `channel` between the two newest readings.
    pub async fn trend(&self, channel: Channel) -> Option<Trend> {
        let history = self.history.read().await;
        let len = history.len();
        if len < 2 {
            return None;
        }
        Some(Trend::between(channel, &history[len - 2], &history[len - 1]))
    }

    /// Watch the newest reading.
    pub fn subscribe(&self) -> watch::Receiver<Option<ConsciousnessReading>> {
        self.latest.subscribe()
    }
}

impl Default for MetricsMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
