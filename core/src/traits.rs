//! Core sink trait
//!
//! The trait is defined in core so the harness never depends on a concrete
//! backend. Implementations live in the `tsload-sinks` crate.

use crate::point::DataPoint;
use async_trait::async_trait;
use std::time::Duration;

// ============================================================================
// Sink Trait
// ============================================================================

/// Write/query endpoint under load test
///
/// One instance is shared by every worker of a run, so `write` is called
/// concurrently and implementations must be internally synchronized. The
/// harness never adds locking around a sink.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Sink identifier (e.g., "memory", "influx-v2")
    fn name(&self) -> &str;

    /// Submit one point
    ///
    /// Delivery is attempted only; a returned error is counted by the worker
    /// and otherwise ignored.
    async fn write(&self, point: DataPoint) -> Result<(), SinkError>;

    /// Deliver everything buffered client-side
    ///
    /// Called once the workers stopped and before `count`, so the count sees
    /// every accepted point. Sinks without a buffer keep the default.
    async fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Number of delivered points stored under `measurement`
    async fn count(&self, measurement: &str) -> Result<u64, SinkError>;

    /// Release resources (flush buffers, drop connections)
    async fn close(&self) -> Result<(), SinkError>;
}

/// Sink-specific errors
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Transport level failure (connection refused, reset, DNS)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Endpoint answered with a non-success status
    #[error("Rejected: {status} - {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Request timed out
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Response could not be interpreted
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Sink configuration is unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Sink has already been closed
    #[error("Sink is closed")]
    Closed,
}

impl SinkError {
    /// Check if the endpoint was overloaded rather than broken
    ///
    /// Used only to pick the log level of dropped writes; nothing is retried.
    pub fn is_overload(&self) -> bool {
        match self {
            SinkError::Timeout(_) => true,
            SinkError::Rejected { status, .. } => *status == 429 || *status == 503,
            _ => false,
        }
    }
}
