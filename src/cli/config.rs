//! Configuration file and the merged effective configuration

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tsload_core::RunConfig;
use tsload_sinks::{SinkKind, SinkSettings};

use super::Cli;

// ============================================================================
// Config file (JSON)
// ============================================================================

/// Contents of a `--config` file; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Run shape and behaviour
    pub run: RunConfig,
    /// Sink connection settings
    pub sink: SinkSettings,
}

/// Read and parse a JSON config file
pub fn load_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

// ============================================================================
// Effective - merged config
// ============================================================================

/// Final configuration after merging: defaults < config file < env/CLI
#[derive(Debug, Clone)]
pub struct Effective {
    /// Validated run configuration
    pub run: RunConfig,
    /// Selected backend
    pub sink_kind: SinkKind,
    /// Backend connection settings
    pub sink: SinkSettings,
}

impl Effective {
    /// Merge the CLI arguments over the config file (if any) and defaults
    pub fn new(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => load_config(path)?,
            None => FileConfig::default(),
        };

        let mut run = file.run;
        if let Some(workers) = cli.workers {
            run.workers = workers;
        }
        if let Some(duration) = cli.duration {
            run.duration_secs = duration;
        }
        if let Some(batch_size) = cli.batch_size {
            run.batch_size = batch_size;
        }
        if let Some(measurement) = &cli.measurement {
            run.measurement = measurement.clone();
        }
        if let Some(sink) = cli.sink {
            run.sink = SinkKind::from(sink).to_string();
        }
        if cli.skip_verification {
            run.skip_verification = true;
        }
        if let Some(pacing) = cli.pacing {
            run.pacing = pacing.into();
        }
        if let Some(tick_interval_ms) = cli.tick_interval_ms {
            run.tick_interval_ms = tick_interval_ms;
        }

        let mut sink = file.sink;
        if let Some(url) = &cli.url {
            sink.url = url.clone();
        }
        if let Some(database) = &cli.database {
            sink.database = database.clone();
        }
        if let Some(org) = &cli.org {
            sink.org = org.clone();
        }
        if let Some(bucket) = &cli.bucket {
            sink.bucket = bucket.clone();
        }
        if let Some(token) = &cli.token {
            sink.token = token.clone();
        }
        if let Some(write_mode) = cli.write_mode {
            sink.write_mode = write_mode.into();
        }
        if let Some(flush_batch_size) = cli.flush_batch_size {
            sink.flush_batch_size = flush_batch_size;
        }
        if let Some(flush_interval_ms) = cli.flush_interval_ms {
            sink.flush_interval_ms = flush_interval_ms;
        }
        if let Some(timeout_ms) = cli.timeout_ms {
            sink.timeout_ms = timeout_ms;
        }

        run.validate().context("Invalid run configuration")?;
        let sink_kind: SinkKind = run.sink.parse().context("Invalid run configuration")?;

        Ok(Self {
            run,
            sink_kind,
            sink,
        })
    }
}
