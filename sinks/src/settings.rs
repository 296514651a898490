//! Sink selection and connection settings

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use tsload_core::SinkError;

/// Default endpoint of a local InfluxDB
pub const DEFAULT_URL: &str = "http://localhost:8086";

/// Default client-side buffer size in batched mode
pub const DEFAULT_FLUSH_BATCH_SIZE: usize = 50_000;

/// Default client-side flush interval in batched mode
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 10_000;

/// Default request timeout
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Available sink backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SinkKind {
    /// In-process sink, no network (dry run)
    #[default]
    Memory,
    /// InfluxDB 1.x HTTP API
    InfluxV1,
    /// InfluxDB 2.x HTTP API
    InfluxV2,
}

impl SinkKind {
    /// Selector string as used on the command line and in config files
    pub fn as_str(&self) -> &'static str {
        match self {
            SinkKind::Memory => "memory",
            SinkKind::InfluxV1 => "influx-v1",
            SinkKind::InfluxV2 => "influx-v2",
        }
    }

    /// All selectors, for help texts
    pub fn all() -> &'static [SinkKind] {
        &[SinkKind::Memory, SinkKind::InfluxV1, SinkKind::InfluxV2]
    }
}

impl std::fmt::Display for SinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SinkKind {
    type Err = SinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(SinkKind::Memory),
            "influx-v1" | "influxdb-v1" | "v1" => Ok(SinkKind::InfluxV1),
            "influx-v2" | "influxdb-v2" | "v2" => Ok(SinkKind::InfluxV2),
            other => Err(SinkError::Config(format!(
                "unknown sink '{}', expected one of: memory, influx-v1, influx-v2",
                other
            ))),
        }
    }
}

/// How points reach an HTTP sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// One HTTP request per point
    #[default]
    Direct,
    /// Client-side buffer flushed by size or interval
    Batched,
}

impl std::fmt::Display for WriteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteMode::Direct => write!(f, "direct"),
            WriteMode::Batched => write!(f, "batched"),
        }
    }
}

/// Connection settings shared by the HTTP sinks
///
/// Unused fields are ignored by sinks that do not need them (the memory
/// sink ignores everything, the v1 sink ignores org, bucket and token).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkSettings {
    /// Base URL of the server
    pub url: String,

    /// Database name (v1)
    pub database: String,

    /// Organization (v2)
    pub org: String,

    /// Bucket (v2)
    pub bucket: String,

    /// API token (v2)
    pub token: String,

    /// Direct or batched writes
    pub write_mode: WriteMode,

    /// Buffered lines that trigger a flush in batched mode
    pub flush_batch_size: usize,

    /// Flush interval in batched mode, in milliseconds
    pub flush_interval_ms: u64,

    /// HTTP request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            database: "iot_writes".to_string(),
            org: "my-org".to_string(),
            bucket: "my-bucket".to_string(),
            token: "my-token".to_string(),
            write_mode: WriteMode::default(),
            flush_batch_size: DEFAULT_FLUSH_BATCH_SIZE,
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl SinkSettings {
    /// Flush interval in batched mode
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// HTTP request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Base URL without trailing slashes
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Validate the settings for the given sink
    pub fn validate(&self, kind: SinkKind) -> Result<(), SinkError> {
        if kind == SinkKind::Memory {
            return Ok(());
        }

        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(SinkError::Config(format!(
                "url must start with http:// or https://, got '{}'",
                self.url
            )));
        }
        if self.timeout_ms == 0 {
            return Err(SinkError::Config("timeout must be positive".into()));
        }
        if self.write_mode == WriteMode::Batched {
            if self.flush_batch_size == 0 {
                return Err(SinkError::Config("flush batch size must be at least 1".into()));
            }
            if self.flush_interval_ms == 0 {
                return Err(SinkError::Config("flush interval must be positive".into()));
            }
        }

        match kind {
            SinkKind::InfluxV1 if self.database.is_empty() => {
                Err(SinkError::Config("database must not be empty".into()))
            }
            SinkKind::InfluxV2 if self.org.is_empty() || self.bucket.is_empty() => {
                Err(SinkError::Config("org and bucket must not be empty".into()))
            }
            _ => Ok(()),
        }
    }
}
