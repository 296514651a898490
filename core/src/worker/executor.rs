//! Worker execution loop

use crate::cancel::CancellationListener;
use crate::generator::BatchGenerator;
use crate::metrics::TickRecord;
use crate::traits::Sink;

use super::rate_limiter::TickPacer;
use super::stats::{WorkerState, WorkerStats};

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Worker drives one writer: generate -> submit -> sleep, once per tick
///
/// Workers are tokio tasks managed by the Orchestrator. They share the sink
/// via Arc and own everything else: tick counter, pacer, stats.
pub struct Worker {
    /// Worker identity (1..=N)
    id: usize,

    /// Sink under test (shared across workers)
    sink: Arc<dyn Sink>,

    /// Batch generator for the run's measurement
    generator: BatchGenerator,

    /// Number of ticks to run when not cancelled
    ticks: u64,

    /// Points per tick
    batch_size: usize,

    /// Distance between two tick starts
    tick_interval: Duration,

    /// Spread pacing within a tick
    pacer: TickPacer,

    /// Tick record channel, if anyone observes the run
    tick_tx: Option<mpsc::Sender<TickRecord>>,

    /// Lifecycle state
    state: WorkerState,

    /// Current tick index
    tick: u64,
}

impl Worker {
    /// Create a new worker
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        sink: Arc<dyn Sink>,
        generator: BatchGenerator,
        ticks: u64,
        batch_size: usize,
        tick_interval: Duration,
        pacer: TickPacer,
        tick_tx: Option<mpsc::Sender<TickRecord>>,
    ) -> Self {
        Self {
            id,
            sink,
            generator,
            ticks,
            batch_size,
            tick_interval,
            pacer,
            tick_tx,
            state: WorkerState::Running,
            tick: 0,
        }
    }

    /// Run the worker loop
    ///
    /// Returns when all ticks are done or cancellation was observed. The
    /// returned stats always carry [`WorkerState::Done`]: once this future
    /// resolves the worker issues no further writes.
    pub async fn run(mut self, mut cancel: CancellationListener) -> WorkerStats {
        let mut stats = WorkerStats::new(self.id);
        stats.start();

        tracing::debug!(worker_id = self.id, ticks = self.ticks, "Worker started");

        while self.tick < self.ticks {
            if cancel.is_closed() {
                self.transition(WorkerState::Stopping);
                break;
            }

            let tick_started = tokio::time::Instant::now();
            let record = self.run_tick(&mut cancel, &mut stats).await;
            let interrupted = record.cancelled;
            if !interrupted {
                stats.ticks_completed += 1;
            }
            self.publish(record);

            if interrupted {
                self.transition(WorkerState::Stopping);
                break;
            }

            self.tick += 1;

            tokio::select! {
                biased;

                _ = cancel.closed() => {
                    // the deadline ending the final sleep is a normal finish
                    if self.tick < self.ticks {
                        self.transition(WorkerState::Stopping);
                    }
                    break;
                }

                // ticks start one interval apart however long the batch took
                _ = tokio::time::sleep_until(tick_started + self.tick_interval) => {}
            }
        }

        stats.cancelled = self.state == WorkerState::Stopping;
        self.transition(WorkerState::Done);
        stats.state = self.state;
        stats.stop();

        tracing::debug!(
            worker_id = self.id,
            ticks_completed = stats.ticks_completed,
            written = stats.written,
            failed = stats.failed,
            cancelled = stats.cancelled,
            elapsed_ms = ?stats.elapsed().map(|d| d.as_millis()),
            "Worker finished"
        );

        stats
    }

    /// Generate and submit the batch of the current tick
    ///
    /// Cancellation is checked before every point, so a large batch stops
    /// promptly; the write already in flight is allowed to finish.
    async fn run_tick(
        &self,
        cancel: &mut CancellationListener,
        stats: &mut WorkerStats,
    ) -> TickRecord {
        let started = Instant::now();
        let batch = self.generator.generate(self.id, self.tick, self.batch_size);

        let mut record = TickRecord {
            worker_id: self.id,
            tick: self.tick,
            attempted: 0,
            written: 0,
            failed: 0,
            cancelled: false,
            elapsed: Duration::ZERO,
        };

        for point in batch {
            if cancel.is_closed() {
                record.cancelled = true;
                break;
            }

            if self.pacer.is_enabled() {
                tokio::select! {
                    biased;

                    _ = cancel.closed() => {
                        record.cancelled = true;
                        break;
                    }

                    _ = self.pacer.wait() => {}
                }
            }

            let index = point.timestamp();
            record.attempted += 1;
            match self.sink.write(point).await {
                Ok(()) => {
                    record.written += 1;
                    stats.record_success();
                }
                Err(e) => {
                    // Dropped writes are part of the measurement, never retried
                    record.failed += 1;
                    stats.record_failure();
                    tracing::debug!(
                        worker_id = self.id,
                        tick = self.tick,
                        index,
                        overload = e.is_overload(),
                        error = %e,
                        "Write failed"
                    );
                }
            }
        }

        record.elapsed = started.elapsed();
        record
    }

    fn publish(&self, record: TickRecord) {
        let Some(tx) = &self.tick_tx else {
            return;
        };

        match tx.try_send(record) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(record)) => {
                tracing::debug!(
                    worker_id = self.id,
                    tick = record.tick,
                    "Tick channel full, dropping record"
                );
            }
        }
    }

    fn transition(&mut self, next: WorkerState) {
        tracing::trace!(
            worker_id = self.id,
            tick = self.tick,
            from = ?self.state,
            to = ?next,
            "Worker state change"
        );
        self.state = next;
    }

    /// Get the worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Current lifecycle state
    pub fn state(&self) -> WorkerState {
        self.state
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("sink", &self.sink.name())
            .field("measurement", &self.generator.measurement())
            .field("ticks", &self.ticks)
            .field("batch_size", &self.batch_size)
            .field("tick_interval", &self.tick_interval)
            .field("pacer", &self.pacer)
            .field("state", &self.state)
            .finish()
    }
}
