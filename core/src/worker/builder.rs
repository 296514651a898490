//! Builder pattern for Worker construction

use crate::config::{PacingMode, RunConfig, DEFAULT_TICK_INTERVAL_MS};
use crate::error::{BenchError, BenchResult};
use crate::generator::BatchGenerator;
use crate::metrics::TickRecord;
use crate::traits::Sink;

use super::executor::Worker;
use super::rate_limiter::TickPacer;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Builder for creating Worker instances
///
/// # Example
/// ```ignore
/// let worker = WorkerBuilder::new(1)
///     .sink(sink)
///     .config(&run_config)
///     .tick_tx(tx)
///     .build()?;
/// ```
pub struct WorkerBuilder {
    id: usize,
    sink: Option<Arc<dyn Sink>>,
    measurement: Option<String>,
    ticks: Option<u64>,
    batch_size: Option<usize>,
    tick_interval: Duration,
    pacing: PacingMode,
    tick_tx: Option<mpsc::Sender<TickRecord>>,
}

impl WorkerBuilder {
    /// Create a new builder for worker `id` (1-based)
    pub fn new(id: usize) -> Self {
        Self {
            id,
            sink: None,
            measurement: None,
            ticks: None,
            batch_size: None,
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            pacing: PacingMode::default(),
            tick_tx: None,
        }
    }

    /// Set the sink
    pub fn sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Take measurement, ticks, batch size, tick interval and pacing from a run config
    pub fn config(self, config: &RunConfig) -> Self {
        self.measurement(config.measurement.clone())
            .ticks(config.duration_secs)
            .batch_size(config.batch_size)
            .tick_interval(config.tick_interval())
            .pacing(config.pacing)
    }

    /// Set the measurement identifier
    pub fn measurement(mut self, measurement: impl Into<String>) -> Self {
        self.measurement = Some(measurement.into());
        self
    }

    /// Set the number of ticks
    pub fn ticks(mut self, ticks: u64) -> Self {
        self.ticks = Some(ticks);
        self
    }

    /// Set the number of points per tick
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Set the tick length
    pub fn tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Set the pacing mode
    pub fn pacing(mut self, pacing: PacingMode) -> Self {
        self.pacing = pacing;
        self
    }

    /// Set the tick record channel sender
    pub fn tick_tx(mut self, tx: mpsc::Sender<TickRecord>) -> Self {
        self.tick_tx = Some(tx);
        self
    }

    /// Build the Worker
    ///
    /// # Errors
    /// Returns a configuration error if a required field is missing or a
    /// numeric field is zero.
    pub fn build(self) -> BenchResult<Worker> {
        let sink = self.sink.ok_or(BenchError::missing_config("sink"))?;
        let measurement = self
            .measurement
            .ok_or(BenchError::missing_config("measurement"))?;
        let ticks = self.ticks.ok_or(BenchError::missing_config("ticks"))?;
        let batch_size = self
            .batch_size
            .ok_or(BenchError::missing_config("batch_size"))?;

        if self.id == 0 {
            return Err(BenchError::config("worker ids start at 1"));
        }
        if batch_size == 0 {
            return Err(BenchError::config("batch size must be at least 1"));
        }

        let pacer = TickPacer::new(self.pacing, batch_size, self.tick_interval);

        Ok(Worker::new(
            self.id,
            sink,
            BatchGenerator::new(measurement),
            ticks,
            batch_size,
            self.tick_interval,
            pacer,
            self.tick_tx,
        ))
    }
}
