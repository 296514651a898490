//! Post-run verification against the sink

use std::sync::Arc;
use std::time::Duration;

use crate::config::RunConfig;
use crate::error::{BenchError, BenchResult};
use crate::metrics::RunResult;
use crate::traits::Sink;

/// Queries the sink once all workers are done and computes delivery metrics
pub struct ResultReporter {
    sink: Arc<dyn Sink>,
}

impl ResultReporter {
    /// Create a reporter for the run's sink
    pub fn new(sink: Arc<dyn Sink>) -> Self {
        Self { sink }
    }

    /// Flush the sink, then count the points stored under the run's measurement
    ///
    /// Called at most once per run, after the workers stopped. A failed flush
    /// only lowers the count, like any failed write. A failed count query is
    /// returned as a query error and not retried.
    pub async fn report(&self, config: &RunConfig, elapsed: Duration) -> BenchResult<RunResult> {
        if let Err(e) = self.sink.flush().await {
            tracing::warn!(
                sink = self.sink.name(),
                error = %e,
                "Failed to flush sink before counting"
            );
        }

        let actual = self
            .sink
            .count(&config.measurement)
            .await
            .map_err(|e| BenchError::query(format!("{}: {}", self.sink.name(), e)))?;

        let result = RunResult {
            measurement: config.measurement.clone(),
            expected: config.expected_count(),
            actual,
            duration_secs: config.duration_secs,
            elapsed,
        };

        tracing::info!(
            measurement = %result.measurement,
            expected = result.expected,
            actual = result.actual,
            rate_percent = result.rate_percent(),
            rate_per_sec = result.rate_per_sec(),
            "Verification finished"
        );

        Ok(result)
    }
}

impl std::fmt::Debug for ResultReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultReporter")
            .field("sink", &self.sink.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BenchErrorKind;
    use crate::point::DataPoint;
    use crate::traits::SinkError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedCountSink {
        count: Option<u64>,
        queries: AtomicUsize,
    }

    #[async_trait]
    impl Sink for FixedCountSink {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn write(&self, _point: DataPoint) -> Result<(), SinkError> {
            Ok(())
        }

        async fn count(&self, _measurement: &str) -> Result<u64, SinkError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.count
                .ok_or_else(|| SinkError::Connection("connection refused".into()))
        }

        async fn close(&self) -> Result<(), SinkError> {
            Ok(())
        }
    }

    /// Holds writes back until flushed, like a client-side batching sink
    #[derive(Default)]
    struct BufferingSink {
        pending: AtomicUsize,
        stored: AtomicUsize,
        fail_flush: bool,
    }

    #[async_trait]
    impl Sink for BufferingSink {
        fn name(&self) -> &str {
            "buffering"
        }

        async fn write(&self, _point: DataPoint) -> Result<(), SinkError> {
            self.pending.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn flush(&self) -> Result<(), SinkError> {
            if self.fail_flush {
                return Err(SinkError::Connection("connection reset".into()));
            }
            let pending = self.pending.swap(0, Ordering::SeqCst);
            self.stored.fetch_add(pending, Ordering::SeqCst);
            Ok(())
        }

        async fn count(&self, _measurement: &str) -> Result<u64, SinkError> {
            Ok(self.stored.load(Ordering::SeqCst) as u64)
        }

        async fn close(&self) -> Result<(), SinkError> {
            Ok(())
        }
    }

    fn sink(count: Option<u64>) -> Arc<FixedCountSink> {
        Arc::new(FixedCountSink {
            count,
            queries: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_report_full_delivery() {
        let config = RunConfig::new(4, 2, 5).with_measurement("sensor_1");
        let reporter = ResultReporter::new(sink(Some(40)));

        let result = reporter
            .report(&config, Duration::from_secs(2))
            .await
            .unwrap();

        assert_eq!(result.measurement, "sensor_1");
        assert_eq!(result.expected, 40);
        assert_eq!(result.actual, 40);
        assert_eq!(result.rate_percent(), 100.0);
        assert_eq!(result.rate_per_sec(), 20.0);
        assert_eq!(result.missing(), 0);
    }

    #[tokio::test]
    async fn test_report_partial_delivery() {
        let config = RunConfig::new(1, 1, 10);
        let reporter = ResultReporter::new(sink(Some(5)));

        let result = reporter.report(&config, Duration::from_secs(1)).await.unwrap();

        assert_eq!(result.expected, 10);
        assert_eq!(result.actual, 5);
        assert_eq!(result.rate_percent(), 50.0);
        assert_eq!(result.missing(), 5);
    }

    #[tokio::test]
    async fn test_report_query_failure_not_retried() {
        let config = RunConfig::new(1, 1, 10);
        let sink = sink(None);
        let reporter = ResultReporter::new(sink.clone());

        let err = reporter
            .report(&config, Duration::from_secs(1))
            .await
            .unwrap_err();

        assert_eq!(err.kind, BenchErrorKind::Query);
        assert!(err.message.contains("connection refused"));
        assert_eq!(sink.queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_report_flushes_buffered_writes_before_counting() {
        let config = RunConfig::new(1, 4, 10).with_measurement("sensor");
        let sink = Arc::new(BufferingSink::default());
        for i in 0..40 {
            sink.write(DataPoint::new("sensor", i)).await.unwrap();
        }
        assert_eq!(sink.count("sensor").await.unwrap(), 0);

        let result = ResultReporter::new(sink)
            .report(&config, Duration::from_secs(4))
            .await
            .unwrap();

        assert_eq!(result.actual, 40);
        assert_eq!(result.rate_percent(), 100.0);
    }

    #[tokio::test]
    async fn test_report_flush_failure_lowers_count_only() {
        let config = RunConfig::new(1, 1, 10).with_measurement("sensor");
        let sink = Arc::new(BufferingSink {
            fail_flush: true,
            ..Default::default()
        });
        sink.write(DataPoint::new("sensor", 0)).await.unwrap();

        let result = ResultReporter::new(sink)
            .report(&config, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(result.actual, 0);
        assert_eq!(result.missing(), 10);
    }
}
