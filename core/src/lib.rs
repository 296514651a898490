//! tsload-core: the concurrency harness of the tsload load generator
//!
//! This crate fans out a configurable number of writers against a
//! time-series [`Sink`], stops them cooperatively at a deadline and verifies
//! the delivered count afterwards. It provides:
//!
//! - Run configuration and validation
//! - Data points and per-tick batch generation
//! - The Sink trait implemented by every backend
//! - Workers, the orchestrator and the close-once cancellation signal
//! - Tick telemetry, aggregated statistics and the final run result
//! - Error handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod channel;
pub mod config;
pub mod error;
pub mod generator;
pub mod metrics;
pub mod orchestrator;
pub mod point;
pub mod report;
pub mod traits;
pub mod worker;

pub use cancel::{CancellationListener, CancellationSignal};
pub use channel::ChannelConfig;
pub use config::{ConfigError, PacingMode, RunConfig};
pub use error::*;
pub use generator::BatchGenerator;
pub use metrics::*;
pub use orchestrator::{
    aggregate_worker_stats, AggregatedStats, Orchestrator, OrchestratorBuilder, RunHandle,
    RunSummary,
};
pub use point::{DataPoint, FieldValue};
pub use report::ResultReporter;
pub use traits::*;
pub use worker::{TickPacer, Worker, WorkerBuilder, WorkerState, WorkerStats};
