//! Builder pattern for Orchestrator construction

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::channel::ChannelConfig;
use crate::config::RunConfig;
use crate::error::{BenchError, BenchResult};
use crate::metrics::TickRecord;
use crate::traits::Sink;

use super::executor::Orchestrator;

/// Builder for creating an Orchestrator with a validated configuration
///
/// # Example
///
/// ```ignore
/// let (orchestrator, tick_rx) = OrchestratorBuilder::new()
///     .workers(10)
///     .duration_secs(5)
///     .batch_size(100)
///     .sink(sink)
///     .build()?;
/// ```
pub struct OrchestratorBuilder {
    config: RunConfig,
    sink: Option<Arc<dyn Sink>>,
    channel_config: ChannelConfig,
}

impl OrchestratorBuilder {
    /// Create a new orchestrator builder with default configuration
    pub fn new() -> Self {
        Self {
            config: RunConfig::default(),
            sink: None,
            channel_config: ChannelConfig::default(),
        }
    }

    /// Set the full run configuration
    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the worker count
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Set the run duration in seconds
    pub fn duration_secs(mut self, secs: u64) -> Self {
        self.config.duration_secs = secs;
        self
    }

    /// Set the number of points per worker tick
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    /// Set the sink
    pub fn sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Set the channel configuration
    pub fn channel_config(mut self, config: ChannelConfig) -> Self {
        self.channel_config = config;
        self
    }

    /// Build the orchestrator and return it along with the tick record receiver
    ///
    /// # Errors
    ///
    /// Returns an error if the sink is not set or if configuration
    /// validation fails. Nothing is spawned and the sink is never called.
    pub fn build(self) -> BenchResult<(Orchestrator, mpsc::Receiver<TickRecord>)> {
        self.config
            .validate()
            .map_err(|e| BenchError::config(e.to_string()))?;

        let sink = self.sink.ok_or_else(|| BenchError::missing_config("sink"))?;

        // tokio panics on a zero capacity
        let (tick_tx, tick_rx) = mpsc::channel(self.channel_config.tick_buffer.max(1));

        let orchestrator = Orchestrator::new(self.config, sink, tick_tx);

        Ok((orchestrator, tick_rx))
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
