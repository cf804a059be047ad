//! Feed behavior with a scripted push channel.

use async_trait::async_trait;
use aura_core::{FeedError, PartialReading};
use aura_monitor::{FeedState, MetricsFeed, MetricsMonitor, StatusSource, DEFAULT_HISTORY_CAPACITY};
use aura_test_utils::ChannelPush;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct FixedSource {
    polls: AtomicUsize,
}

#[async_trait]
impl StatusSource for FixedSource {
    async fn poll(&self) -> Result<PartialReading, FeedError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(PartialReading {
            phi: Some(0.5),
            ..PartialReading::default()
        })
    }
}

fn pushed(phi: f64) -> Result<PartialReading, FeedError> {
    Ok(PartialReading {
        phi: Some(phi),
        gamma: Some(0.02),
        w2: Some(0.05),
        lambda: Some(2.0e-8),
    })
}

#[tokio::test(start_paused = true)]
async fn test_pushed_readings_reach_monitor_without_polling() {
    let monitor = Arc::new(MetricsMonitor::default());
    let source = Arc::new(FixedSource::default());
    let (push, tx) = ChannelPush::pair();
    let handle = MetricsFeed::new(monitor.clone(), source.clone())
        .with_push(Box::new(push))
        .spawn();

    tx.send(pushed(0.9)).unwrap();
    tx.send(pushed(0.8)).unwrap();
    tokio::time::sleep(Duration::from_secs(12)).await;

    assert_eq!(handle.state(), FeedState::Connected);
    assert_eq!(source.polls.load(Ordering::SeqCst), 0);
    let phis: Vec<f64> = monitor.history().await.iter().map(|r| r.phi).collect();
    assert_eq!(phis, vec![0.9, 0.8]);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_dropped_push_channel_reverts_to_polling() {
    let monitor = Arc::new(MetricsMonitor::default());
    let source = Arc::new(FixedSource::default());
    let (push, tx) = ChannelPush::pair();
    let handle = MetricsFeed::new(monitor.clone(), source.clone())
        .with_push(Box::new(push))
        .spawn();

    tx.send(pushed(0.9)).unwrap();
    drop(tx);
    tokio::time::sleep(Duration::from_millis(5_500)).await;

    assert_eq!(handle.state(), FeedState::Disconnected);
    assert!(source.polls.load(Ordering::SeqCst) >= 2);
    assert_eq!(monitor.history().await[0].phi, 0.9);
    assert_eq!(monitor.current().await.map(|r| r.phi), Some(0.5));
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_malformed_push_is_skipped() {
    let monitor = Arc::new(MetricsMonitor::default());
    let (push, tx) = ChannelPush::pair();
    let handle = MetricsFeed::new(monitor.clone(), Arc::new(FixedSource::default()))
        .with_push(Box::new(push))
        .spawn();

    tx.send(Err(FeedError::Malformed { reason: "bad json".to_string() })).unwrap();
    tx.send(pushed(0.7)).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(handle.state(), FeedState::Connected);
    assert_eq!(monitor.len().await, 1);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_refused_push_polls_from_start() {
    let monitor = Arc::new(MetricsMonitor::default());
    let source = Arc::new(FixedSource::default());
    let handle = MetricsFeed::new(monitor.clone(), source.clone())
        .with_push(Box::new(ChannelPush::refusing()))
        .spawn();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(handle.state(), FeedState::Disconnected);
    assert_eq!(source.polls.load(Ordering::SeqCst), 1);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_flood_of_pushes_stays_within_capacity() {
    let monitor = Arc::new(MetricsMonitor::default());
    let (push, tx) = ChannelPush::pair();
    let handle = MetricsFeed::new(monitor.clone(), Arc::new(FixedSource::default()))
        .with_push(Box::new(push))
        .spawn();

    for i in 0..250 {
        tx.send(pushed(i as f64 / 250.0)).unwrap();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(monitor.len().await, DEFAULT_HISTORY_CAPACITY);
    let newest = monitor.current().await.unwrap();
    assert!((newest.phi - 249.0 / 250.0).abs() < 1e-12);
    handle.shutdown().await;
}
