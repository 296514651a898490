//! Integration tests for the Worker module

use super::*;
use crate::cancel::CancellationSignal;
use crate::config::{PacingMode, RunConfig};
use crate::metrics::TickRecord;
use crate::point::DataPoint;
use crate::traits::{Sink, SinkError};

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

// ============================================================================
// Mock Sink
// ============================================================================

#[derive(Debug, Clone)]
struct Submission {
    worker_id: Option<usize>,
    index: u64,
    started_at: Instant,
}

struct MockSink {
    delay: Option<Duration>,
    fail_odd: bool,
    calls: AtomicUsize,
    submissions: Mutex<Vec<Submission>>,
}

impl MockSink {
    fn new() -> Self {
        Self {
            delay: None,
            fail_odd: false,
            calls: AtomicUsize::new(0),
            submissions: Mutex::new(Vec::new()),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn with_fail_odd(mut self) -> Self {
        self.fail_odd = true;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sink for MockSink {
    fn name(&self) -> &str {
        "mock"
    }

    async fn write(&self, point: DataPoint) -> Result<(), SinkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.submissions.lock().unwrap().push(Submission {
            worker_id: point.worker_id(),
            index: point.timestamp(),
            started_at: Instant::now(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_odd && point.timestamp() % 2 == 1 {
            return Err(SinkError::Rejected {
                status: 500,
                message: "odd index".to_string(),
            });
        }
        Ok(())
    }

    async fn count(&self, _measurement: &str) -> Result<u64, SinkError> {
        Ok(0)
    }

    async fn close(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

fn worker(id: usize, sink: Arc<MockSink>, ticks: u64, batch_size: usize) -> Worker {
    WorkerBuilder::new(id)
        .sink(sink)
        .measurement("sensor_test")
        .ticks(ticks)
        .batch_size(batch_size)
        .tick_interval(Duration::from_secs(1))
        .build()
        .unwrap()
}

// ============================================================================
// Run loop
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_worker_full_run_emits_contiguous_indices() {
    let sink = Arc::new(MockSink::new());
    let signal = CancellationSignal::new();

    let stats = worker(1, sink.clone(), 3, 4).run(signal.listener()).await;

    let indices: Vec<u64> = sink.submissions().iter().map(|s| s.index).collect();
    assert_eq!(indices, (0..12).collect::<Vec<u64>>());
    assert!(sink
        .submissions()
        .iter()
        .all(|s| s.worker_id == Some(1)));

    assert_eq!(stats.worker_id, 1);
    assert_eq!(stats.attempted, 12);
    assert_eq!(stats.written, 12);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.ticks_completed, 3);
    assert!(!stats.cancelled);
    assert_eq!(stats.state, WorkerState::Done);
}

#[tokio::test(start_paused = true)]
async fn test_worker_ticks_are_one_interval_apart() {
    let sink = Arc::new(MockSink::new());
    let signal = CancellationSignal::new();

    worker(1, sink.clone(), 3, 2).run(signal.listener()).await;

    let starts: Vec<Instant> = sink
        .submissions()
        .iter()
        .filter(|s| s.index % 2 == 0)
        .map(|s| s.started_at)
        .collect();
    assert_eq!(starts.len(), 3);
    assert_eq!(starts[1] - starts[0], Duration::from_secs(1));
    assert_eq!(starts[2] - starts[1], Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_slow_writes_do_not_stretch_the_tick() {
    // 2 writes of 200ms each still fit in a one-second tick
    let sink = Arc::new(MockSink::new().with_delay(Duration::from_millis(200)));
    let signal = CancellationSignal::new();

    let started = Instant::now();
    worker(1, sink.clone(), 3, 2).run(signal.listener()).await;

    let starts: Vec<Instant> = sink
        .submissions()
        .iter()
        .filter(|s| s.index % 2 == 0)
        .map(|s| s.started_at)
        .collect();
    assert_eq!(starts.len(), 3);
    assert_eq!(starts[1] - starts[0], Duration::from_secs(1));
    assert_eq!(starts[2] - starts[1], Duration::from_secs(1));
    assert_eq!(Instant::now() - started, Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_worker_counts_failures_without_retry() {
    let sink = Arc::new(MockSink::new().with_fail_odd());
    let signal = CancellationSignal::new();

    let stats = worker(1, sink.clone(), 1, 10).run(signal.listener()).await;

    assert_eq!(sink.calls(), 10);
    assert_eq!(stats.attempted, 10);
    assert_eq!(stats.written, 5);
    assert_eq!(stats.failed, 5);
    assert_eq!(stats.ticks_completed, 1);
    assert!(!stats.cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_worker_zero_ticks() {
    let sink = Arc::new(MockSink::new());
    let signal = CancellationSignal::new();

    let stats = worker(1, sink.clone(), 0, 10).run(signal.listener()).await;

    assert_eq!(sink.calls(), 0);
    assert_eq!(stats.state, WorkerState::Done);
    assert!(!stats.cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_worker_uses_run_config() {
    let sink = Arc::new(MockSink::new());
    let signal = CancellationSignal::new();
    let config = RunConfig::new(1, 2, 3).with_measurement("sensor_cfg");

    let stats = WorkerBuilder::new(2)
        .sink(sink.clone())
        .config(&config)
        .build()
        .unwrap()
        .run(signal.listener())
        .await;

    assert_eq!(stats.written, 6);
    assert!(sink
        .submissions()
        .iter()
        .all(|s| s.worker_id == Some(2)));
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_worker_cancelled_before_start() {
    let sink = Arc::new(MockSink::new());
    let signal = CancellationSignal::new();
    signal.close();

    let stats = worker(1, sink.clone(), 5, 10).run(signal.listener()).await;

    assert_eq!(sink.calls(), 0);
    assert_eq!(stats.attempted, 0);
    assert_eq!(stats.ticks_completed, 0);
    assert!(stats.cancelled);
    assert_eq!(stats.state, WorkerState::Done);
}

#[tokio::test(start_paused = true)]
async fn test_worker_cancelled_mid_batch() {
    let sink = Arc::new(MockSink::new().with_delay(Duration::from_millis(10)));
    let signal = CancellationSignal::new();

    let handle = tokio::spawn(worker(1, sink.clone(), 1, 100).run(signal.listener()));

    tokio::time::sleep(Duration::from_millis(55)).await;
    let closed_at = Instant::now();
    assert!(signal.close());

    let stats = handle.await.unwrap();

    assert!(stats.cancelled);
    assert_eq!(stats.state, WorkerState::Done);
    assert_eq!(stats.ticks_completed, 0);
    assert!(stats.attempted > 0);
    assert!(stats.attempted < 100);

    // Only the write already in flight may finish after close
    assert!(sink
        .submissions()
        .iter()
        .all(|s| s.started_at <= closed_at));
}

#[tokio::test(start_paused = true)]
async fn test_worker_cancelled_during_sleep_returns_promptly() {
    let sink = Arc::new(MockSink::new());
    let signal = CancellationSignal::new();

    let handle = tokio::spawn(worker(1, sink.clone(), 10, 2).run(signal.listener()));

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let closed_at = Instant::now();
    signal.close();

    let stats = handle.await.unwrap();

    assert!(Instant::now() - closed_at < Duration::from_millis(10));
    assert_eq!(stats.ticks_completed, 2);
    assert_eq!(stats.written, 4);
    assert!(stats.cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_close_during_final_sleep_is_not_a_cancellation() {
    let sink = Arc::new(MockSink::new());
    let signal = CancellationSignal::new();

    let handle = tokio::spawn(worker(1, sink.clone(), 2, 3).run(signal.listener()));

    tokio::time::sleep(Duration::from_millis(1500)).await;
    signal.close();

    let stats = handle.await.unwrap();

    assert_eq!(stats.ticks_completed, 2);
    assert_eq!(stats.written, 6);
    assert!(!stats.cancelled);
    assert_eq!(stats.state, WorkerState::Done);
}

// ============================================================================
// Tick records
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_worker_publishes_tick_records() {
    let sink = Arc::new(MockSink::new().with_fail_odd());
    let signal = CancellationSignal::new();
    let (tx, mut rx) = mpsc::channel::<TickRecord>(16);

    let stats = WorkerBuilder::new(3)
        .sink(sink)
        .measurement("sensor_test")
        .ticks(3)
        .batch_size(4)
        .tick_tx(tx)
        .build()
        .unwrap()
        .run(signal.listener())
        .await;

    let mut records = Vec::new();
    while let Some(record) = rx.recv().await {
        records.push(record);
    }

    assert_eq!(records.len(), 3);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.worker_id, 3);
        assert_eq!(record.tick, i as u64);
        assert_eq!(record.attempted, 4);
        assert_eq!(record.written, 2);
        assert_eq!(record.failed, 2);
        assert!(!record.cancelled);
    }
    assert_eq!(stats.written, 6);
}

#[tokio::test(start_paused = true)]
async fn test_worker_full_tick_channel_never_blocks() {
    let sink = Arc::new(MockSink::new());
    let signal = CancellationSignal::new();
    let (tx, _rx) = mpsc::channel::<TickRecord>(1);

    let stats = WorkerBuilder::new(1)
        .sink(sink)
        .measurement("sensor_test")
        .ticks(5)
        .batch_size(1)
        .tick_tx(tx)
        .build()
        .unwrap()
        .run(signal.listener())
        .await;

    assert_eq!(stats.ticks_completed, 5);
    assert_eq!(stats.written, 5);
}

// ============================================================================
// Pacing
// ============================================================================

#[tokio::test]
async fn test_worker_spread_pacing_submits_whole_batch() {
    let sink = Arc::new(MockSink::new());
    let signal = CancellationSignal::new();

    let stats = WorkerBuilder::new(1)
        .sink(sink.clone())
        .measurement("sensor_test")
        .ticks(1)
        .batch_size(5)
        .tick_interval(Duration::from_millis(50))
        .pacing(PacingMode::Spread)
        .build()
        .unwrap()
        .run(signal.listener())
        .await;

    assert_eq!(stats.written, 5);
    assert_eq!(sink.calls(), 5);
}

#[test]
fn test_worker_debug_and_accessors() {
    let sink = Arc::new(MockSink::new());
    let worker = worker(7, sink, 1, 1);

    assert_eq!(worker.id(), 7);
    assert_eq!(worker.state(), WorkerState::Running);
    let debug = format!("{:?}", worker);
    assert!(debug.contains("sensor_test"));
    assert!(debug.contains("mock"));
}
