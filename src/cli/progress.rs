//! Run progress display fed by the tick record channel

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tsload_core::{RunConfig, TickRecord};

/// Background task draining tick records into a progress display
///
/// The task ends on its own once every worker is done, because the workers
/// hold the only senders.
pub struct Progress {
    handle: JoinHandle<()>,
}

impl Progress {
    /// Spawn the display task
    ///
    /// With `bar` set an indicatif bar counts ticks over `workers * duration`;
    /// otherwise worker 1 prints one line per tick.
    pub fn spawn(rx: mpsc::Receiver<TickRecord>, config: &RunConfig, bar: bool) -> Self {
        let total_ticks = (config.workers as u64).saturating_mul(config.duration_secs);
        let iterations = config.duration_secs;

        let handle = if bar {
            tokio::spawn(drive_bar(rx, progress_bar(total_ticks)))
        } else {
            tokio::spawn(print_iterations(rx, iterations))
        };

        Self { handle }
    }

    /// Wait for the display to drain the remaining records
    pub async fn finish(self) {
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Progress task panicked");
        }
    }
}

fn progress_bar(total_ticks: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_ticks);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ticks {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-"),
    );
    pb
}

async fn drive_bar(mut rx: mpsc::Receiver<TickRecord>, pb: ProgressBar) {
    let mut tally = Tally::default();

    while let Some(record) = rx.recv().await {
        tally.add(&record);
        if !record.cancelled {
            pb.inc(1);
        }
        pb.set_message(tally.message());
    }

    // keeps the position: an interrupted run must not show a full bar
    pb.abandon_with_message(tally.message());
}

async fn print_iterations(mut rx: mpsc::Receiver<TickRecord>, iterations: u64) {
    while let Some(record) = rx.recv().await {
        if record.worker_id == 1 && !record.cancelled {
            println!("writing iterations: {}/{}", record.tick + 1, iterations);
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    written: usize,
    failed: usize,
}

impl Tally {
    fn add(&mut self, record: &TickRecord) {
        self.written += record.written;
        self.failed += record.failed;
    }

    fn message(&self) -> String {
        if self.failed == 0 {
            format!("written: {}", self.written)
        } else {
            format!("written: {} failed: {}", self.written, self.failed)
        }
    }
}
