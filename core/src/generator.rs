//! Batch generation for worker ticks

use crate::point::{DataPoint, READING_FIELD, WORKER_TAG};

/// Produces the points a worker submits during one tick
///
/// Point `offset` of tick `tick` gets the synthetic index
/// `tick * batch_size + offset`. Ticks are zero-based, so a worker that
/// completes `duration` ticks emits exactly the indices
/// `0..duration * batch_size`, in order and without repeats.
#[derive(Debug, Clone)]
pub struct BatchGenerator {
    measurement: String,
}

impl BatchGenerator {
    /// Create a generator for the given measurement
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
        }
    }

    /// Measurement every generated point belongs to
    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    /// Synthetic index of a point
    pub fn index(tick: u64, batch_size: usize, offset: usize) -> u64 {
        tick * batch_size as u64 + offset as u64
    }

    /// Generate the batch for `worker_id` at `tick`
    ///
    /// The wall clock is read only for the reading payload; identity is fully
    /// determined by the arguments.
    pub fn generate(&self, worker_id: usize, tick: u64, batch_size: usize) -> Vec<DataPoint> {
        let worker = worker_id.to_string();
        (0..batch_size)
            .map(|offset| {
                DataPoint::new(
                    self.measurement.as_str(),
                    Self::index(tick, batch_size, offset),
                )
                .tag(WORKER_TAG, worker.as_str())
                .field(READING_FIELD, reading())
            })
            .collect()
    }
}

fn reading() -> i64 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| chrono::Utc::now().timestamp_micros())
}
