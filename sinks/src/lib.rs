//! Sink implementations for the tsload harness
//!
//! This crate provides implementations of the `Sink` trait for:
//!
//! - An in-process memory sink (dry runs, tests)
//! - InfluxDB 1.x over HTTP
//! - InfluxDB 2.x over HTTP
//!
//! The HTTP sinks write line protocol either one point per request or
//! through a client-side buffer (see [`WriteMode`]).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batching;
pub mod http;
pub mod influx_v1;
pub mod influx_v2;
pub mod line_protocol;
pub mod line_sink;
pub mod memory;
pub mod settings;

use std::sync::Arc;

use tsload_core::{Sink, SinkError};

pub use influx_v1::InfluxV1Endpoint;
pub use influx_v2::InfluxV2Endpoint;
pub use line_sink::{LineEndpoint, LineSink};
pub use memory::MemorySink;
pub use settings::{SinkKind, SinkSettings, WriteMode};

/// Build and connect the selected sink
///
/// HTTP sinks ping their server first, so an unreachable endpoint fails
/// here, before any load is generated. Batched sinks spawn their flush task
/// and must be built inside a tokio runtime.
pub async fn build_sink(kind: SinkKind, settings: &SinkSettings) -> Result<Arc<dyn Sink>, SinkError> {
    settings.validate(kind)?;

    let sink: Arc<dyn Sink> = match kind {
        SinkKind::Memory => Arc::new(MemorySink::new()),
        SinkKind::InfluxV1 => {
            let endpoint = InfluxV1Endpoint::new(settings)?;
            endpoint.ping().await?;
            Arc::new(line_sink(endpoint, settings))
        }
        SinkKind::InfluxV2 => {
            let endpoint = InfluxV2Endpoint::new(settings)?;
            endpoint.ping().await?;
            Arc::new(line_sink(endpoint, settings))
        }
    };

    tracing::info!(
        sink = %kind,
        url = if kind == SinkKind::Memory { "-" } else { settings.base_url() },
        write_mode = %settings.write_mode,
        "Sink ready"
    );

    Ok(sink)
}

fn line_sink<E: LineEndpoint>(endpoint: E, settings: &SinkSettings) -> LineSink<E> {
    LineSink::with_mode(
        endpoint,
        settings.write_mode,
        settings.flush_batch_size,
        settings.flush_interval(),
    )
}
