//! JSON export functionality

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tsload_core::{RunConfig, RunResult, RunSummary};
use tsload_sinks::SinkKind;

use super::config::Effective;

#[derive(Serialize)]
struct Report<'a> {
    generated_at: DateTime<Utc>,
    sink: SinkKind,
    config: &'a RunConfig,
    summary: &'a RunSummary,
    result: Option<&'a RunResult>,
    rate_percent: Option<f64>,
    rate_per_sec: Option<f64>,
}

/// Write the run report as pretty-printed JSON
///
/// Sink credentials are not part of the report.
pub fn write_json(
    path: &Path,
    effective: &Effective,
    summary: &RunSummary,
    result: Option<&RunResult>,
) -> Result<()> {
    let report = Report {
        generated_at: Utc::now(),
        sink: effective.sink_kind,
        config: &effective.run,
        summary,
        result,
        rate_percent: result.map(RunResult::rate_percent),
        rate_per_sec: result.map(RunResult::rate_per_sec),
    };

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
