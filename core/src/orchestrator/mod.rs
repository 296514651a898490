//! Orchestrator for run lifecycle management
//!
//! The Orchestrator coordinates one complete load run:
//! - Spawning one worker task per configured writer
//! - Spawning the deadline task that closes the cancellation signal
//! - Waiting until every worker has observed the signal and is done
//! - Aggregating the per-worker statistics
//!
//! # Example
//!
//! ```ignore
//! use tsload_core::orchestrator::OrchestratorBuilder;
//!
//! let (orchestrator, tick_rx) = OrchestratorBuilder::new()
//!     .config(run_config)
//!     .sink(sink)
//!     .build()?;
//!
//! let handle = orchestrator.start()?;
//! let summary = handle.await_completion().await?;
//! ```

mod aggregator;
mod builder;
mod executor;

pub use aggregator::{aggregate_worker_stats, AggregatedStats};
pub use builder::OrchestratorBuilder;
pub use executor::{Orchestrator, RunHandle, RunSummary};
