//! Sink over a line-protocol endpoint, in direct or batched mode

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tsload_core::{CancellationSignal, DataPoint, Sink, SinkError};

use crate::batching::{flush_lines, spawn_flusher, LineBuffer};
use crate::line_protocol;
use crate::settings::WriteMode;

/// A server that accepts line protocol and answers count queries
#[async_trait]
pub trait LineEndpoint: Send + Sync + 'static {
    /// Sink identifier
    fn name(&self) -> &'static str;

    /// Write a newline separated body of lines
    async fn write_lines(&self, body: String) -> Result<(), SinkError>;

    /// Number of points stored under `measurement`
    async fn count(&self, measurement: &str) -> Result<u64, SinkError>;
}

/// [`Sink`] adapter for a [`LineEndpoint`]
///
/// In [`WriteMode::Direct`] every point is one request. In
/// [`WriteMode::Batched`] points are buffered and flushed when the buffer
/// fills up or the flush interval elapses; `flush` and `close` send the
/// remainder.
pub struct LineSink<E: LineEndpoint> {
    endpoint: Arc<E>,
    mode: WriteMode,
    buffer: Arc<LineBuffer>,
    stop: CancellationSignal,
    flusher: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl<E: LineEndpoint> LineSink<E> {
    /// One request per point
    pub fn direct(endpoint: E) -> Self {
        Self {
            endpoint: Arc::new(endpoint),
            mode: WriteMode::Direct,
            buffer: Arc::new(LineBuffer::new(1)),
            stop: CancellationSignal::new(),
            flusher: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Buffered writes; spawns the flush task, so this needs a tokio runtime
    pub fn batched(endpoint: E, flush_batch_size: usize, flush_interval: Duration) -> Self {
        let endpoint = Arc::new(endpoint);
        let buffer = Arc::new(LineBuffer::new(flush_batch_size));
        let stop = CancellationSignal::new();
        let flusher = spawn_flusher(
            Arc::clone(&endpoint),
            Arc::clone(&buffer),
            flush_interval,
            &stop,
        );

        Self {
            endpoint,
            mode: WriteMode::Batched,
            buffer,
            stop,
            flusher: Mutex::new(Some(flusher)),
            closed: AtomicBool::new(false),
        }
    }

    /// Build in the given mode
    pub fn with_mode(
        endpoint: E,
        mode: WriteMode,
        flush_batch_size: usize,
        flush_interval: Duration,
    ) -> Self {
        match mode {
            WriteMode::Direct => Self::direct(endpoint),
            WriteMode::Batched => Self::batched(endpoint, flush_batch_size, flush_interval),
        }
    }

    /// The wrapped endpoint
    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    /// Write mode
    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Lines waiting in the client-side buffer
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

#[async_trait]
impl<E: LineEndpoint> Sink for LineSink<E> {
    fn name(&self) -> &str {
        self.endpoint.name()
    }

    async fn write(&self, point: DataPoint) -> Result<(), SinkError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SinkError::Closed);
        }

        let line = line_protocol::encode(&point);
        match self.mode {
            WriteMode::Direct => self.endpoint.write_lines(line).await,
            WriteMode::Batched => match self.buffer.push(line) {
                Some(full) => flush_lines(self.endpoint.as_ref(), full).await,
                None => Ok(()),
            },
        }
    }

    async fn flush(&self) -> Result<(), SinkError> {
        self.buffer.flush_into(self.endpoint.as_ref()).await
    }

    async fn count(&self, measurement: &str) -> Result<u64, SinkError> {
        self.endpoint.count(measurement).await
    }

    async fn close(&self) -> Result<(), SinkError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.stop.close();
        let flusher = self
            .flusher
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = flusher {
            if let Err(e) = handle.await {
                tracing::error!(sink = self.endpoint.name(), error = %e, "Flush task panicked");
            }
        }

        self.buffer.flush_into(self.endpoint.as_ref()).await
    }
}

impl<E: LineEndpoint> std::fmt::Debug for LineSink<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineSink")
            .field("endpoint", &self.endpoint.name())
            .field("mode", &self.mode)
            .field("buffered", &self.buffer.len())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}
