//! CLI argument parsing and command handling

mod config;
mod console;
mod export;
mod progress;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tsload_core::{
    BenchError, OrchestratorBuilder, PacingMode, ResultReporter, RunResult, RunSummary, Sink,
};
use tsload_sinks::{build_sink, SinkKind, WriteMode};

use self::config::Effective;
use self::progress::Progress;

/// tsload - concurrent load generator for time-series write sinks
///
/// Every flag falls back to its environment variable, then to the
/// `--config` file, then to the built-in default.
#[derive(Parser, Debug)]
#[command(name = "tsload")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Number of concurrent workers [default: 2000]
    #[arg(short, long, env = "TSLOAD_WORKERS")]
    pub workers: Option<usize>,

    /// Run duration in seconds; one tick per second [default: 30]
    #[arg(short, long, env = "TSLOAD_DURATION")]
    pub duration: Option<u64>,

    /// Points per worker per tick [default: 100]
    #[arg(short, long, env = "TSLOAD_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// Measurement name [default: sensor_<unix nanos>]
    #[arg(short, long, env = "TSLOAD_MEASUREMENT")]
    pub measurement: Option<String>,

    /// Sink to load [default: memory]
    #[arg(short, long, env = "TSLOAD_SINK", value_enum)]
    pub sink: Option<SinkArg>,

    /// Skip counting the stored points at the end of the run
    #[arg(long, env = "TSLOAD_SKIP_VERIFICATION")]
    pub skip_verification: bool,

    /// How writes are paced within a tick [default: burst]
    #[arg(long, env = "TSLOAD_PACING", value_enum)]
    pub pacing: Option<PacingArg>,

    /// Tick length in milliseconds [default: 1000]
    #[arg(long, env = "TSLOAD_TICK_INTERVAL_MS")]
    pub tick_interval_ms: Option<u64>,

    /// Server URL [default: http://localhost:8086]
    #[arg(long, env = "INFLUX_URL")]
    pub url: Option<String>,

    /// Database for influx-v1 [default: iot_writes]
    #[arg(long, env = "INFLUX_DB")]
    pub database: Option<String>,

    /// Organization for influx-v2 [default: my-org]
    #[arg(long, env = "INFLUX_ORG")]
    pub org: Option<String>,

    /// Bucket for influx-v2 [default: my-bucket]
    #[arg(long, env = "INFLUX_BUCKET")]
    pub bucket: Option<String>,

    /// API token for influx-v2 [default: my-token]
    #[arg(long, env = "INFLUX_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// One request per point, or client-side batching [default: direct]
    #[arg(long, env = "TSLOAD_WRITE_MODE", value_enum)]
    pub write_mode: Option<WriteModeArg>,

    /// Buffered points that trigger a flush in batched mode [default: 50000]
    #[arg(long)]
    pub flush_batch_size: Option<usize>,

    /// Flush interval in batched mode, in milliseconds [default: 10000]
    #[arg(long)]
    pub flush_interval_ms: Option<u64>,

    /// HTTP request timeout in milliseconds [default: 30000]
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// JSON config file; flags and env variables override its values
    #[arg(short, long, env = "TSLOAD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Export the run summary and result as JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print plain iteration lines instead of a progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Sink selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkArg {
    /// In-process sink (dry run)
    Memory,
    /// InfluxDB 1.x HTTP API
    InfluxV1,
    /// InfluxDB 2.x HTTP API
    InfluxV2,
}

impl From<SinkArg> for SinkKind {
    fn from(arg: SinkArg) -> Self {
        match arg {
            SinkArg::Memory => SinkKind::Memory,
            SinkArg::InfluxV1 => SinkKind::InfluxV1,
            SinkArg::InfluxV2 => SinkKind::InfluxV2,
        }
    }
}

/// Pacing selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PacingArg {
    /// Whole batch at the start of the tick
    Burst,
    /// Batch spread evenly across the tick
    Spread,
}

impl From<PacingArg> for PacingMode {
    fn from(arg: PacingArg) -> Self {
        match arg {
            PacingArg::Burst => PacingMode::Burst,
            PacingArg::Spread => PacingMode::Spread,
        }
    }
}

/// Write mode selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WriteModeArg {
    /// One HTTP request per point
    Direct,
    /// Client-side buffer flushed by size or interval
    Batched,
}

impl From<WriteModeArg> for WriteMode {
    fn from(arg: WriteModeArg) -> Self {
        match arg {
            WriteModeArg::Direct => WriteMode::Direct,
            WriteModeArg::Batched => WriteMode::Batched,
        }
    }
}

impl Cli {
    /// Run one load test based on CLI arguments
    ///
    /// The sink is closed on every path once it was built; a measurement
    /// error takes precedence over a close error.
    pub async fn run(&self) -> Result<()> {
        let effective = Effective::new(self)?;
        let started = Instant::now();

        console::print_banner(&effective);

        let sink = build_sink(effective.sink_kind, &effective.sink)
            .await
            .map_err(|e| BenchError::sink_construction(e.to_string()))
            .with_context(|| format!("Failed to set up the {} sink", effective.sink_kind))?;

        let measured = self.measure(&effective, Arc::clone(&sink), started).await;

        let closed = sink
            .close()
            .await
            .map_err(|e| BenchError::close(e.to_string()));

        match (measured, closed) {
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    tracing::error!(error = %close_err, "Failed to close sink");
                }
                Err(e)
            }
            (Ok(()), Err(close_err)) => Err(close_err).context("Failed to close sink"),
            (Ok(()), Ok(())) => Ok(()),
        }
    }

    /// Generate the load, then verify and report
    async fn measure(
        &self,
        effective: &Effective,
        sink: Arc<dyn Sink>,
        started: Instant,
    ) -> Result<()> {
        let run = &effective.run;

        let (orchestrator, tick_rx) = OrchestratorBuilder::new()
            .config(run.clone())
            .sink(Arc::clone(&sink))
            .build()?;

        let progress = Progress::spawn(tick_rx, run, !self.no_progress);

        let summary = orchestrator
            .run_with_signal_handling()
            .await
            .context("Load run failed")?;

        progress.finish().await;

        let result = if run.skip_verification {
            None
        } else {
            println!();
            println!("Querying {}...", effective.sink_kind);
            Some(
                ResultReporter::new(sink)
                    .report(run, summary.elapsed)
                    .await
                    .context("Failed to count stored points")?,
            )
        };

        console::print_results(run, &summary, result.as_ref(), started.elapsed());

        if let Some(path) = &self.output {
            export::write_json(path, effective, &summary, result.as_ref())
                .with_context(|| format!("Failed to export JSON to: {}", path.display()))?;
            println!("✓ JSON exported to: {}", path.display());
        }

        warn_if_incomplete(&summary, result.as_ref());

        Ok(())
    }
}

fn warn_if_incomplete(summary: &RunSummary, result: Option<&RunResult>) {
    if summary.aggregated.total_failed > 0 {
        tracing::warn!(
            failed = summary.aggregated.total_failed,
            "Some writes were rejected by the sink"
        );
    }
    if let Some(result) = result {
        if result.missing() > 0 {
            tracing::warn!(missing = result.missing(), "Sink stored fewer points than expected");
        }
    }
}
