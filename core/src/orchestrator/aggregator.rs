//! Result aggregation from multiple workers

use std::time::Duration;

use serde::Serialize;

use crate::worker::WorkerStats;

/// Aggregated statistics from all workers
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregatedStats {
    /// Number of workers that returned stats
    pub total_workers: usize,

    /// Workers that stopped because of cancellation
    pub cancelled_workers: usize,

    /// Total points handed to the sink
    pub total_attempted: usize,

    /// Total points the sink accepted
    pub total_written: usize,

    /// Total points the sink rejected
    pub total_failed: usize,

    /// Total fully submitted ticks
    pub total_ticks: u64,

    /// Maximum duration across all workers
    #[serde(serialize_with = "serialize_secs")]
    pub total_duration: Duration,

    /// Overall attempted writes per second
    pub writes_per_second: f64,
}

impl AggregatedStats {
    /// Get the success rate (0.0 - 1.0)
    pub fn success_rate(&self) -> f64 {
        if self.total_attempted > 0 {
            self.total_written as f64 / self.total_attempted as f64
        } else {
            0.0
        }
    }

    /// Get the failure rate (0.0 - 1.0)
    pub fn failure_rate(&self) -> f64 {
        if self.total_attempted > 0 {
            self.total_failed as f64 / self.total_attempted as f64
        } else {
            0.0
        }
    }
}

fn serialize_secs<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}

/// Aggregate statistics from multiple workers
pub fn aggregate_worker_stats(stats: &[WorkerStats]) -> AggregatedStats {
    if stats.is_empty() {
        return AggregatedStats::default();
    }

    let mut totals = WorkerStats::default();
    for s in stats {
        totals.merge(s);
    }

    // Use the maximum elapsed time across all workers
    let total_duration = stats
        .iter()
        .filter_map(|s| s.elapsed())
        .max()
        .unwrap_or(Duration::ZERO);

    let secs = total_duration.as_secs_f64();
    let writes_per_second = if secs > 0.0 {
        totals.attempted as f64 / secs
    } else {
        0.0
    };

    AggregatedStats {
        total_workers: stats.len(),
        cancelled_workers: stats.iter().filter(|s| s.cancelled).count(),
        total_attempted: totals.attempted,
        total_written: totals.written,
        total_failed: totals.failed,
        total_ticks: totals.ticks_completed,
        total_duration,
        writes_per_second,
    }
}
