//! Error types for tsload-core

use thiserror::Error;

/// Classification of harness errors
///
/// Per-point write failures never become a [`BenchError`]; they are absorbed
/// into the delivery-rate measurement. Everything listed here is fatal to the
/// step that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchErrorKind {
    /// Invalid run parameters, reported before any worker starts
    Config,
    /// The sink endpoint could not be established
    SinkConstruction,
    /// The post-run count query failed
    Query,
    /// Releasing the sink failed
    Close,
    /// Worker or deadline task failure inside the coordinator
    Orchestration,
    /// The run was shut down before the operation could complete
    Shutdown,
}

impl std::fmt::Display for BenchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BenchErrorKind::Config => "configuration error",
            BenchErrorKind::SinkConstruction => "sink construction error",
            BenchErrorKind::Query => "query error",
            BenchErrorKind::Close => "close error",
            BenchErrorKind::Orchestration => "orchestration error",
            BenchErrorKind::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

/// Core error type
#[derive(Error, Debug, Clone)]
#[error("{kind}: {message}")]
pub struct BenchError {
    /// What failed
    pub kind: BenchErrorKind,
    /// Human readable details
    pub message: String,
}

impl BenchError {
    /// Create an error of the given kind
    pub fn new(kind: BenchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Invalid configuration
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(BenchErrorKind::Config, message)
    }

    /// A required builder field was not provided
    pub fn missing_config(field: &str) -> Self {
        Self::config(format!("missing required field: {field}"))
    }

    /// Sink could not be constructed or reached
    pub fn sink_construction(message: impl Into<String>) -> Self {
        Self::new(BenchErrorKind::SinkConstruction, message)
    }

    /// Count query failed
    pub fn query(message: impl Into<String>) -> Self {
        Self::new(BenchErrorKind::Query, message)
    }

    /// Sink close failed
    pub fn close(message: impl Into<String>) -> Self {
        Self::new(BenchErrorKind::Close, message)
    }

    /// Coordinator level failure (deadline task, worker join)
    pub fn orchestration(message: impl Into<String>) -> Self {
        Self::new(BenchErrorKind::Orchestration, message)
    }

    /// Operation interrupted by shutdown
    pub fn shutdown() -> Self {
        Self::new(BenchErrorKind::Shutdown, "run was shut down")
    }

    /// Whether this error is a configuration error
    pub fn is_config(&self) -> bool {
        self.kind == BenchErrorKind::Config
    }
}

/// Result type alias
pub type BenchResult<T> = std::result::Result<T, BenchError>;
