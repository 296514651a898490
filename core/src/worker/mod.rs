//! Worker module: one concurrent writer of a load run
//!
//! The Worker is the execution unit of tsload, responsible for one simple
//! loop repeated once per tick: **generate -> submit -> sleep**.
//!
//! Each Worker is a tokio task that:
//!
//! 1. Checks the run's cancellation signal
//! 2. Materializes the tick's batch via the BatchGenerator
//! 3. Submits every point to the shared Sink, counting (never retrying) failures
//! 4. Re-checks cancellation before each point, so large batches stop promptly
//! 5. Publishes a TickRecord for progress observers
//! 6. Sleeps until the next tick is due, waking early on cancellation
//!
//! # Example
//!
//! ```ignore
//! use tsload_core::worker::WorkerBuilder;
//!
//! let worker = WorkerBuilder::new(1)
//!     .sink(sink)
//!     .config(&run_config)
//!     .build()?;
//!
//! let stats = worker.run(signal.listener()).await;
//! println!("Written: {}", stats.written);
//! ```

mod builder;
mod executor;
mod rate_limiter;
mod stats;

pub use builder::WorkerBuilder;
pub use executor::Worker;
pub use rate_limiter::TickPacer;
pub use stats::{WorkerState, WorkerStats};

#[cfg(test)]
mod tests;
