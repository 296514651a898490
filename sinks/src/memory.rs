//! In-process sink for dry runs and tests

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tsload_core::{DataPoint, Sink, SinkError};

type SeriesKey = (BTreeMap<String, String>, u64);

/// Stores points in memory, keyed like a time-series database
///
/// A point is identified by its measurement, tag set and timestamp; writing
/// the same identity twice overwrites, so collisions show up as a lower
/// count exactly as they would on a real server.
#[derive(Debug, Default)]
pub struct MemorySink {
    series: Mutex<HashMap<String, HashSet<SeriesKey>>>,
    writes: AtomicU64,
    write_delay: Option<Duration>,
    closed: AtomicBool,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a per-write latency
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// Number of accepted write calls, including overwrites
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Whether `close` was called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Sink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn write(&self, point: DataPoint) -> Result<(), SinkError> {
        if self.is_closed() {
            return Err(SinkError::Closed);
        }
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }

        let key = (point.tags().clone(), point.timestamp());
        self.series
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(point.measurement().to_string())
            .or_default()
            .insert(key);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn count(&self, measurement: &str) -> Result<u64, SinkError> {
        let series = self.series.lock().unwrap_or_else(|e| e.into_inner());
        Ok(series.get(measurement).map_or(0, |points| points.len() as u64))
    }

    async fn close(&self) -> Result<(), SinkError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
