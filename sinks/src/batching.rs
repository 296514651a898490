//! Client-side buffering for batched write mode

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tsload_core::{CancellationSignal, SinkError};

use crate::line_sink::LineEndpoint;

/// Shared buffer of encoded lines
///
/// Filled concurrently by every worker; whoever pushes the line that reaches
/// `capacity` takes the whole buffer and flushes it.
#[derive(Debug)]
pub struct LineBuffer {
    lines: Mutex<Vec<String>>,
    capacity: usize,
    flushing: tokio::sync::Mutex<()>,
}

impl LineBuffer {
    /// Create a buffer that fills up at `capacity` lines
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: Mutex::new(Vec::with_capacity(capacity.min(4096))),
            capacity,
            flushing: tokio::sync::Mutex::new(()),
        }
    }

    /// Append a line; returns the full buffer when this line filled it
    pub fn push(&self, line: String) -> Option<Vec<String>> {
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.push(line);
        if lines.len() >= self.capacity {
            Some(std::mem::take(&mut *lines))
        } else {
            None
        }
    }

    /// Take everything buffered so far
    pub fn drain(&self) -> Vec<String> {
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *lines)
    }

    /// Drain the buffer and send it to `endpoint`
    ///
    /// Calls are serialized: this returns only after an interval flush that
    /// was already sending has finished.
    pub async fn flush_into<E: LineEndpoint + ?Sized>(
        &self,
        endpoint: &E,
    ) -> Result<(), SinkError> {
        let _sending = self.flushing.lock().await;
        flush_lines(endpoint, self.drain()).await
    }

    /// Number of buffered lines
    pub fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lines that trigger a flush
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Send buffered lines as one request body
pub async fn flush_lines<E: LineEndpoint + ?Sized>(
    endpoint: &E,
    lines: Vec<String>,
) -> Result<(), SinkError> {
    if lines.is_empty() {
        return Ok(());
    }

    let count = lines.len();
    let result = endpoint.write_lines(lines.join("\n")).await;
    match &result {
        Ok(()) => tracing::debug!(sink = endpoint.name(), lines = count, "Flushed batch"),
        Err(e) => tracing::warn!(
            sink = endpoint.name(),
            lines = count,
            error = %e,
            "Failed to flush batch"
        ),
    }
    result
}

/// Spawn the periodic flush task
///
/// Flushes whatever is buffered every `every` until `stop` is closed. A flush
/// in progress when `stop` closes is completed; the caller drains the rest.
pub fn spawn_flusher<E: LineEndpoint>(
    endpoint: Arc<E>,
    buffer: Arc<LineBuffer>,
    every: Duration,
    stop: &CancellationSignal,
) -> JoinHandle<()> {
    let mut stop = stop.listener();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = stop.closed() => break,

                _ = ticker.tick() => {
                    // Errors are logged by flush_lines; the lines are dropped
                    let _ = buffer.flush_into(endpoint.as_ref()).await;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_fills_at_capacity() {
        let buffer = LineBuffer::new(3);
        assert!(buffer.push("a".into()).is_none());
        assert!(buffer.push("b".into()).is_none());
        assert_eq!(buffer.len(), 2);

        let full = buffer.push("c".into()).unwrap();
        assert_eq!(full, vec!["a", "b", "c"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_buffer_drain() {
        let buffer = LineBuffer::new(10);
        buffer.push("a".into());
        buffer.push("b".into());

        assert_eq!(buffer.drain(), vec!["a", "b"]);
        assert!(buffer.drain().is_empty());
    }

    #[test]
    fn test_buffer_zero_capacity() {
        let buffer = LineBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        assert!(buffer.push("a".into()).is_some());
    }

    #[test]
    fn test_buffer_concurrent_pushes_lose_nothing() {
        let buffer = Arc::new(LineBuffer::new(7));
        let flushed = Arc::new(Mutex::new(0usize));

        let threads: Vec<_> = (0..4)
            .map(|t| {
                let buffer = Arc::clone(&buffer);
                let flushed = Arc::clone(&flushed);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        if let Some(batch) = buffer.push(format!("{t}-{i}")) {
                            *flushed.lock().unwrap() += batch.len();
                        }
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        let total = *flushed.lock().unwrap() + buffer.drain().len();
        assert_eq!(total, 400);
    }
}
