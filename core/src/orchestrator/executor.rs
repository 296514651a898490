//! Orchestrator execution logic

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;

use crate::cancel::CancellationSignal;
use crate::config::RunConfig;
use crate::error::{BenchError, BenchResult};
use crate::metrics::TickRecord;
use crate::traits::Sink;
use crate::worker::{WorkerBuilder, WorkerStats};

use super::aggregator::{aggregate_worker_stats, AggregatedStats};

/// Orchestrator manages the run lifecycle
///
/// Responsible for spawning workers and the deadline task, and for handing
/// out the [`RunHandle`] that collects results. The sink is shared with the
/// workers and never closed here; closing it belongs to the caller.
pub struct Orchestrator {
    /// Run configuration, validated by the builder
    pub(crate) config: RunConfig,

    /// Sink under test (shared across workers)
    pub(crate) sink: Arc<dyn Sink>,

    /// Tick record sender (cloned for each worker)
    pub(crate) tick_tx: mpsc::Sender<TickRecord>,

    /// Stop signal shared by the deadline task, abort paths and workers
    pub(crate) signal: CancellationSignal,
}

/// Outcome of a run once every worker is done
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Per-worker statistics, ordered by worker id
    #[serde(skip)]
    pub worker_stats: Vec<WorkerStats>,

    /// Totals across all workers
    pub aggregated: AggregatedStats,

    /// Wall time from start until the last worker finished
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,

    /// Whether the signal was closed (deadline or abort) before the workers ran out of ticks
    pub cancelled: bool,
}

fn serialize_secs<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}

impl Orchestrator {
    /// Create a new orchestrator
    ///
    /// Use `OrchestratorBuilder` for a validated construction.
    pub fn new(config: RunConfig, sink: Arc<dyn Sink>, tick_tx: mpsc::Sender<TickRecord>) -> Self {
        Self {
            config,
            sink,
            tick_tx,
            signal: CancellationSignal::new(),
        }
    }

    /// Get a handle on the run's cancellation signal
    pub fn signal(&self) -> CancellationSignal {
        self.signal.clone()
    }

    /// Close the cancellation signal
    ///
    /// Returns `true` if this call closed it.
    pub fn abort(&self) -> bool {
        self.signal.close()
    }

    /// Get the run configuration
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Start the run
    ///
    /// Builds every worker first, so a configuration error surfaces before
    /// anything is spawned, then spawns one task per worker and the deadline
    /// task. Must be called from within a tokio runtime.
    pub fn start(self) -> BenchResult<RunHandle> {
        self.config
            .validate()
            .map_err(|e| BenchError::config(e.to_string()))?;

        let workers = (1..=self.config.workers)
            .map(|worker_id| {
                WorkerBuilder::new(worker_id)
                    .sink(Arc::clone(&self.sink))
                    .config(&self.config)
                    .tick_tx(self.tick_tx.clone())
                    .build()
            })
            .collect::<BenchResult<Vec<_>>>()?;

        tracing::info!(
            workers = self.config.workers,
            duration_secs = self.config.duration_secs,
            batch_size = self.config.batch_size,
            measurement = %self.config.measurement,
            sink = self.sink.name(),
            pacing = %self.config.pacing,
            expected = self.config.expected_count(),
            "Starting run"
        );

        let started = Instant::now();

        let handles = workers
            .into_iter()
            .map(|worker| {
                let worker_id = worker.id();
                let listener = self.signal.listener();
                (worker_id, tokio::spawn(worker.run(listener)))
            })
            .collect();

        let deadline = {
            let signal = self.signal.clone();
            let after = self.config.deadline();
            tokio::spawn(async move {
                tokio::time::sleep(after).await;
                if signal.close() {
                    tracing::info!(
                        deadline_secs = after.as_secs_f64(),
                        "Deadline reached, stopping workers"
                    );
                }
            })
        };

        Ok(RunHandle {
            signal: self.signal,
            workers: handles,
            deadline,
            started,
        })
    }

    /// Run to completion
    pub async fn run(self) -> BenchResult<RunSummary> {
        self.start()?.await_completion().await
    }

    /// Run with Ctrl+C signal handling
    ///
    /// Ctrl+C closes the cancellation signal; the run then completes normally
    /// with whatever was written so far.
    pub async fn run_with_signal_handling(self) -> BenchResult<RunSummary> {
        let signal = self.signal.clone();

        let signal_handle = tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    if signal.close() {
                        tracing::info!("Received Ctrl+C, stopping workers...");
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                }
            }
        });

        let result = self.run().await;

        signal_handle.abort();

        result
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("sink", &self.sink.name())
            .field("cancelled", &self.signal.is_closed())
            .finish()
    }
}

/// A started run
///
/// Dropping the handle does not stop the workers; call [`abort`](Self::abort)
/// and then [`await_completion`](Self::await_completion) for an early stop.
pub struct RunHandle {
    signal: CancellationSignal,
    workers: Vec<(usize, JoinHandle<WorkerStats>)>,
    deadline: JoinHandle<()>,
    started: Instant,
}

impl RunHandle {
    /// Get a handle on the run's cancellation signal
    pub fn signal(&self) -> CancellationSignal {
        self.signal.clone()
    }

    /// Close the cancellation signal; idempotent with the deadline
    pub fn abort(&self) -> bool {
        self.signal.close()
    }

    /// Number of spawned workers
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Wait until every worker is done
    ///
    /// Never returns on the deadline alone: the deadline only closes the
    /// signal, and this waits for each worker to observe it. Once this
    /// returns no worker issues further writes.
    ///
    /// # Errors
    ///
    /// Returns an orchestration error if the deadline task panicked or if
    /// every worker panicked.
    pub async fn await_completion(self) -> BenchResult<RunSummary> {
        let outcome = join_workers(self.workers, self.deadline, &self.signal).await;
        let elapsed = self.started.elapsed();

        if let Some(reason) = outcome.deadline_failure {
            return Err(BenchError::orchestration(format!(
                "Deadline task failed: {}",
                reason
            )));
        }

        if outcome.stats.is_empty() && outcome.worker_failures > 0 {
            return Err(BenchError::orchestration(format!(
                "All {} workers failed to complete",
                outcome.worker_failures
            )));
        }

        let aggregated = aggregate_worker_stats(&outcome.stats);
        let cancelled = self.signal.is_closed() && aggregated.cancelled_workers > 0;

        tracing::info!(
            elapsed_secs = elapsed.as_secs_f64(),
            written = aggregated.total_written,
            failed = aggregated.total_failed,
            cancelled_workers = aggregated.cancelled_workers,
            writes_per_sec = aggregated.writes_per_second,
            "Run completed"
        );

        Ok(RunSummary {
            worker_stats: outcome.stats,
            aggregated,
            elapsed,
            cancelled,
        })
    }
}

impl std::fmt::Debug for RunHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunHandle")
            .field("workers", &self.workers.len())
            .field("cancelled", &self.signal.is_closed())
            .finish()
    }
}

pub(crate) struct JoinOutcome {
    pub(crate) stats: Vec<WorkerStats>,
    pub(crate) worker_failures: usize,
    pub(crate) deadline_failure: Option<String>,
}

/// Join every worker while watching the deadline task
///
/// A failed deadline task can no longer stop the run, so the signal is
/// closed on its behalf and the remaining workers are still joined.
pub(crate) async fn join_workers(
    workers: Vec<(usize, JoinHandle<WorkerStats>)>,
    mut deadline: JoinHandle<()>,
    signal: &CancellationSignal,
) -> JoinOutcome {
    let mut outcome = JoinOutcome {
        stats: Vec::with_capacity(workers.len()),
        worker_failures: 0,
        deadline_failure: None,
    };
    let mut deadline_done = false;

    for (worker_id, mut handle) in workers {
        let joined = loop {
            if deadline_done {
                break (&mut handle).await;
            }

            tokio::select! {
                joined = &mut handle => break joined,
                result = &mut deadline => {
                    deadline_done = true;
                    if let Err(e) = result {
                        on_deadline_failure(e, signal, &mut outcome);
                    }
                }
            }
        };

        match joined {
            Ok(stats) => {
                tracing::debug!(
                    worker_id,
                    written = stats.written,
                    failed = stats.failed,
                    cancelled = stats.cancelled,
                    "Worker completed"
                );
                outcome.stats.push(stats);
            }
            Err(e) => {
                outcome.worker_failures += 1;
                tracing::error!(worker_id, error = %e, "Worker task panicked");
                // Continue collecting other results
            }
        }
    }

    if !deadline_done {
        if deadline.is_finished() {
            if let Err(e) = deadline.await {
                on_deadline_failure(e, signal, &mut outcome);
            }
        } else {
            deadline.abort();
        }
    }

    outcome
}

fn on_deadline_failure(e: JoinError, signal: &CancellationSignal, outcome: &mut JoinOutcome) {
    // An aborted deadline is not a failure
    if e.is_cancelled() {
        return;
    }
    tracing::error!(error = %e, "Deadline task panicked, stopping workers");
    signal.close();
    outcome.deadline_failure = Some(e.to_string());
}
