//! Worker statistics tracking

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Lifecycle of a worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Iterating ticks
    #[default]
    Running,
    /// Cancellation observed, unwinding
    Stopping,
    /// Finished; no further writes will be issued
    Done,
}

/// Statistics tracked by each worker
#[derive(Debug, Default, Clone)]
pub struct WorkerStats {
    /// Worker identity (1..=N)
    pub worker_id: usize,

    /// Points handed to the sink
    pub attempted: usize,

    /// Points the sink accepted
    pub written: usize,

    /// Points the sink rejected
    pub failed: usize,

    /// Ticks whose batch was fully submitted
    pub ticks_completed: u64,

    /// Whether the worker stopped because of cancellation
    pub cancelled: bool,

    /// Final lifecycle state
    pub state: WorkerState,

    /// Worker start time
    pub started_at: Option<Instant>,

    /// Worker end time
    pub ended_at: Option<Instant>,
}

impl WorkerStats {
    /// Create new empty stats for a worker
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            ..Default::default()
        }
    }

    /// Start tracking (records start time)
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    /// Stop tracking (records end time)
    pub fn stop(&mut self) {
        self.ended_at = Some(Instant::now());
    }

    /// Share of attempted writes the sink accepted (0.0 - 1.0)
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.written as f64 / self.attempted as f64
        }
    }

    /// Share of attempted writes the sink rejected (0.0 - 1.0)
    pub fn failure_rate(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.failed as f64 / self.attempted as f64
        }
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> Option<std::time::Duration> {
        self.started_at.map(|start| {
            self.ended_at
                .map(|end| end.duration_since(start))
                .unwrap_or_else(|| start.elapsed())
        })
    }

    /// Attempted writes per second
    pub fn writes_per_second(&self) -> f64 {
        self.elapsed()
            .map(|d| {
                let secs = d.as_secs_f64();
                if secs > 0.0 {
                    self.attempted as f64 / secs
                } else {
                    0.0
                }
            })
            .unwrap_or(0.0)
    }

    /// Record an accepted write
    pub fn record_success(&mut self) {
        self.attempted += 1;
        self.written += 1;
    }

    /// Record a rejected write
    pub fn record_failure(&mut self) {
        self.attempted += 1;
        self.failed += 1;
    }

    /// Merge counters from another worker
    pub fn merge(&mut self, other: &WorkerStats) {
        self.attempted += other.attempted;
        self.written += other.written;
        self.failed += other.failed;
        self.ticks_completed += other.ticks_completed;
    }
}
