//! Run configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of concurrent writers
pub const DEFAULT_WORKERS: usize = 2000;

/// Default run duration in seconds
pub const DEFAULT_DURATION_SECS: u64 = 30;

/// Default points per worker per tick
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default tick length in milliseconds
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

/// How a worker distributes its batch over a tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacingMode {
    /// Submit the whole batch back to back, then sleep for the tick
    #[default]
    Burst,
    /// Spread the batch evenly over the tick
    Spread,
}

impl std::fmt::Display for PacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PacingMode::Burst => f.write_str("burst"),
            PacingMode::Spread => f.write_str("spread"),
        }
    }
}

/// Run configuration
///
/// Built once at startup and handed to the orchestrator, which keeps it
/// unchanged for the lifetime of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Number of concurrent workers
    pub workers: usize,

    /// Run duration in seconds; also the number of ticks per worker
    pub duration_secs: u64,

    /// Points generated per worker per tick
    pub batch_size: usize,

    /// Measurement (series) identifier all points are written to
    pub measurement: String,

    /// Sink selector, resolved by the sink factory
    pub sink: String,

    /// Skip the post-run count query
    pub skip_verification: bool,

    /// Pacing of writes within a tick
    pub pacing: PacingMode,

    /// Tick length in milliseconds
    pub tick_interval_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            duration_secs: DEFAULT_DURATION_SECS,
            batch_size: DEFAULT_BATCH_SIZE,
            measurement: default_measurement(),
            sink: "memory".to_string(),
            skip_verification: false,
            pacing: PacingMode::default(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

/// Measurement name unique to this process start: `sensor_<unix nanos>`
pub fn default_measurement() -> String {
    let now = chrono::Utc::now();
    let nanos = now
        .timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros() * 1000);
    format!("sensor_{nanos}")
}

impl RunConfig {
    /// Create a config with the given shape and defaults for everything else
    pub fn new(workers: usize, duration_secs: u64, batch_size: usize) -> Self {
        Self {
            workers,
            duration_secs,
            batch_size,
            ..Default::default()
        }
    }

    /// Set the measurement identifier
    pub fn with_measurement(mut self, measurement: impl Into<String>) -> Self {
        self.measurement = measurement.into();
        self
    }

    /// Set the sink selector
    pub fn with_sink(mut self, sink: impl Into<String>) -> Self {
        self.sink = sink.into();
        self
    }

    /// Skip or perform the post-run verification
    pub fn with_skip_verification(mut self, skip: bool) -> Self {
        self.skip_verification = skip;
        self
    }

    /// Set the pacing mode
    pub fn with_pacing(mut self, pacing: PacingMode) -> Self {
        self.pacing = pacing;
        self
    }

    /// Set the tick length
    pub fn with_tick_interval(mut self, tick: Duration) -> Self {
        self.tick_interval_ms = tick.as_millis() as u64;
        self
    }

    /// Run duration
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    /// Tick length
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Time after which the deadline closes the run
    ///
    /// `duration_secs` ticks of `tick_interval` each; equal to
    /// [`duration`](Self::duration) with the default one-second tick.
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.saturating_mul(self.duration_secs))
    }

    /// Number of points a fully delivered run stores
    ///
    /// Always `workers * duration_secs * batch_size`, whatever the sink
    /// actually accepted; this is the denominator of the delivery rate.
    pub fn expected_count(&self) -> u64 {
        (self.workers as u64)
            .saturating_mul(self.duration_secs)
            .saturating_mul(self.batch_size as u64)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkers(
                "worker count must be at least 1".into(),
            ));
        }

        if self.duration_secs == 0 {
            return Err(ConfigError::InvalidDuration(
                "duration must be at least 1 second".into(),
            ));
        }

        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(
                "batch size must be at least 1".into(),
            ));
        }

        if self.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidTickInterval(
                "tick interval must be positive".into(),
            ));
        }

        if self.measurement.trim().is_empty() {
            return Err(ConfigError::InvalidMeasurement(
                "measurement must not be empty".into(),
            ));
        }

        if self.sink.trim().is_empty() {
            return Err(ConfigError::InvalidSink("sink must not be empty".into()));
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid worker count: {0}")]
    InvalidWorkers(String),

    /// Invalid duration
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    /// Invalid batch size
    #[error("Invalid batch size: {0}")]
    InvalidBatchSize(String),

    /// Invalid tick interval
    #[error("Invalid tick interval: {0}")]
    InvalidTickInterval(String),

    /// Invalid measurement identifier
    #[error("Invalid measurement: {0}")]
    InvalidMeasurement(String),

    /// Invalid sink selector
    #[error("Invalid sink: {0}")]
    InvalidSink(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RunConfig::default();
        assert_eq!(config.workers, 2000);
        assert_eq!(config.duration_secs, 30);
        assert_eq!(config.batch_size, 100);
        assert!(config.measurement.starts_with("sensor_"));
        assert_eq!(config.pacing, PacingMode::Burst);
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert!(!config.skip_verification);
    }

    #[test]
    fn test_expected_count() {
        assert_eq!(RunConfig::new(4, 2, 5).expected_count(), 40);
        assert_eq!(RunConfig::new(1, 1, 10).expected_count(), 10);
        assert_eq!(RunConfig::default().expected_count(), 6_000_000);
    }

    #[test]
    fn test_deadline() {
        assert_eq!(RunConfig::new(1, 30, 1).deadline(), Duration::from_secs(30));
        let fast = RunConfig::new(1, 30, 1).with_tick_interval(Duration::from_millis(100));
        assert_eq!(fast.deadline(), Duration::from_secs(3));
    }

    #[test]
    fn test_expected_count_ignores_other_settings() {
        let base = RunConfig::new(3, 7, 11);
        let tweaked = base
            .clone()
            .with_pacing(PacingMode::Spread)
            .with_skip_verification(true)
            .with_sink("influx-v2")
            .with_tick_interval(Duration::from_millis(10));
        assert_eq!(base.expected_count(), tweaked.expected_count());
        assert_eq!(tweaked.expected_count(), 3 * 7 * 11);
    }

    #[test]
    fn test_config_builder_pattern() {
        let config = RunConfig::new(10, 5, 20)
            .with_measurement("sensor_test")
            .with_sink("influx-v1")
            .with_tick_interval(Duration::from_millis(250));

        assert_eq!(config.workers, 10);
        assert_eq!(config.measurement, "sensor_test");
        assert_eq!(config.sink, "influx-v1");
        assert_eq!(config.tick_interval_ms, 250);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_workers() {
        let config = RunConfig::new(0, 10, 10);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWorkers(_))
        ));
    }

    #[test]
    fn test_config_validation_zero_duration() {
        let config = RunConfig::new(10, 0, 10);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDuration(_))
        ));
    }

    #[test]
    fn test_config_validation_zero_batch_size() {
        let config = RunConfig::new(10, 10, 0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBatchSize(_))
        ));
    }

    #[test]
    fn test_config_validation_empty_measurement() {
        let config = RunConfig::new(1, 1, 1).with_measurement("  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_deserialize_partial() {
        let config: RunConfig =
            serde_json::from_str(r#"{"workers": 8, "pacing": "spread"}"#).unwrap();

        assert_eq!(config.workers, 8);
        assert_eq!(config.pacing, PacingMode::Spread);
        assert_eq!(config.duration_secs, DEFAULT_DURATION_SECS);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
    }
}
