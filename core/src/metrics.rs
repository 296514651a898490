//! Per-tick records and the final run result

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of one worker tick, published on the tick channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickRecord {
    /// Worker identity (1..=N)
    pub worker_id: usize,
    /// Zero-based tick index
    pub tick: u64,
    /// Points handed to the sink
    pub attempted: usize,
    /// Points the sink accepted
    pub written: usize,
    /// Points the sink rejected
    pub failed: usize,
    /// Whether cancellation interrupted the batch
    pub cancelled: bool,
    /// Time spent submitting the batch
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

/// Expected-vs-actual outcome of a verified run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Measurement the count was taken for
    pub measurement: String,
    /// `workers * duration_secs * batch_size`
    pub expected: u64,
    /// Points the sink reports as stored
    pub actual: u64,
    /// Configured run duration in seconds
    pub duration_secs: u64,
    /// Wall-clock time of the load phase, from worker start to the last worker done
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

impl RunResult {
    /// Delivered share of the expected points, in percent
    pub fn rate_percent(&self) -> f64 {
        if self.expected == 0 {
            0.0
        } else {
            self.actual as f64 / self.expected as f64 * 100.0
        }
    }

    /// Delivered points per second of configured run time
    pub fn rate_per_sec(&self) -> f64 {
        if self.duration_secs == 0 {
            0.0
        } else {
            self.actual as f64 / self.duration_secs as f64
        }
    }

    /// Points that were expected but not found in the sink
    pub fn missing(&self) -> u64 {
        self.expected.saturating_sub(self.actual)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64() * 1000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(ms.max(0.0) / 1000.0))
    }
}
