//! Human-readable console output

use std::time::Duration;

use crossterm::style::Stylize;
use tsload_core::{RunConfig, RunResult, RunSummary};

use super::config::Effective;

const RULE_WIDTH: usize = 70;

/// Print the configuration banner
pub fn print_banner(effective: &Effective) {
    let run = &effective.run;
    let title = format!("   tsload - {}", effective.sink_kind);

    println!("\n{}", "=".repeat(RULE_WIDTH));
    println!("{}", title.blue().bold());
    println!("{}", "=".repeat(RULE_WIDTH));
    println!();
    println!("Configuration:");
    println!("  Workers:        {}", run.workers);
    println!("  Duration:       {} s", run.duration_secs);
    println!("  Batch size:     {}", run.batch_size);
    println!("  Measurement:    {}", run.measurement);
    println!("  Pacing:         {}", run.pacing);
    if run.tick_interval_ms != tsload_core::config::DEFAULT_TICK_INTERVAL_MS {
        println!("  Tick interval:  {} ms", run.tick_interval_ms);
    }
    if effective.sink_kind != tsload_sinks::SinkKind::Memory {
        println!("  URL:            {}", effective.sink.base_url());
        println!("  Write mode:     {}", effective.sink.write_mode);
    }
    println!("  Verification:   {}", if run.skip_verification { "skipped" } else { "enabled" });
    println!("  Expected size:  {}", run.expected_count());
    println!("{}", "=".repeat(RULE_WIDTH));
    println!();
}

/// Print the outcome of the run
pub fn print_results(
    run: &RunConfig,
    summary: &RunSummary,
    result: Option<&RunResult>,
    total: Duration,
) {
    let stats = &summary.aggregated;

    println!();
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("   Results");
    println!("{}", "=".repeat(RULE_WIDTH));
    println!();

    if summary.cancelled {
        println!("{}", "Run stopped before all ticks completed".yellow());
        println!();
    }

    println!("Writes:");
    println!("  Attempted:        {}", stats.total_attempted);
    println!("  Accepted:         {}", stats.total_written);
    let failed = stats.total_failed.to_string();
    if stats.total_failed > 0 {
        println!("  Rejected:         {}", failed.red());
    } else {
        println!("  Rejected:         {}", failed);
    }
    println!("  Writes/sec:       {:.1}", stats.writes_per_second);
    println!();

    match result {
        Some(result) => {
            let rate_percent = format!("{:.2}", result.rate_percent());
            let rate = format!("{:.2}", result.rate_per_sec());
            println!("-> expected:        {}", result.expected);
            println!("-> total:           {}", result.actual);
            if result.missing() == 0 {
                println!("-> rate [%]:        {}", rate_percent.green());
            } else {
                println!("-> rate [%]:        {}", rate_percent.yellow());
            }
            println!("-> rate [msg/sec]:  {}", rate.green());
        }
        None => {
            println!("-> expected:        {}", run.expected_count());
            println!("-> total:           {}", "not verified".dark_grey());
        }
    }

    println!();
    println!("Total time: {:.3?}", total);
    println!("{}", "=".repeat(RULE_WIDTH));
    println!();
}
