//! Startup orchestration.
//!
//! # Order
//! ```text
//! span export pipeline (if OPEN_TELEMETRY_ENABLED)
//!     → logging
//!     → metrics listener (if METRICS_ENABLED)
//!     → graph client → instrumentation
//!     → HTTP listener → serve until signal
//! teardown: uninstrument → flush queued spans
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - A trace agent address that does not resolve only disables export,
//!   it never blocks startup
//! - Listeners start last (traffic only when ready)

use std::io;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tracing_subscriber::util::TryInitError;

use crate::api::UnknownApiModule;
use crate::config::Settings;
use crate::graph::{GraphClient, GraphError, HttpGraphBackend};
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::{
    init_logging, init_metrics, InstrumentationError, Instrumentor, TraceExport,
};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to install log subscriber: {0}")]
    Logging(#[from] TryInitError),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("invalid graph database settings: {0}")]
    Graph(#[from] GraphError),

    #[error(transparent)]
    ApiModule(#[from] UnknownApiModule),

    #[error(transparent)]
    Instrumentation(#[from] InstrumentationError),

    #[error("failed to bind {address}: {source}")]
    Bind { address: String, source: io::Error },

    #[error("server error: {0}")]
    Server(#[from] io::Error),
}

/// Run the service until a termination signal arrives.
pub async fn serve(settings: Arc<Settings>) -> Result<(), StartupError> {
    let shutdown = Arc::new(Shutdown::new());
    let trace_export = start_trace_export(&settings);

    init_logging(&settings, trace_export.as_ref().map(TraceExport::tracer))?;
    tracing::info!(
        app = %settings.app_name,
        version = env!("CARGO_PKG_VERSION"),
        workers = settings.workers,
        threads = settings.threads,
        "Starting"
    );

    if settings.metrics.enabled {
        init_metrics(settings.metrics.address)?;
    }

    let backend = Arc::new(HttpGraphBackend::new(&settings.neo4j)?);
    let graph = GraphClient::new(backend);
    let instrumentor = Instrumentor::new(graph.dispatch().clone());
    if settings.telemetry.enabled {
        instrumentor.instrument();
    }

    let server = HttpServer::new(settings.clone(), graph)?;
    let address = settings.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;

    signals::spawn_signal_listener(shutdown.clone());
    let served = server.run(listener, shutdown.subscribe()).await;

    shutdown.trigger();
    instrumentor.uninstrument()?;
    if let Some(trace_export) = trace_export {
        trace_export.shutdown().await;
    }

    served?;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Build the span export pipeline when telemetry is enabled.
///
/// Runs before logging is installed, so failures go to stderr.
fn start_trace_export(settings: &Settings) -> Option<TraceExport> {
    if !settings.telemetry.enabled {
        return None;
    }

    match TraceExport::jaeger(settings) {
        Ok(export) => Some(export),
        Err(e) => {
            let telemetry = &settings.telemetry;
            eprintln!(
                "trace agent {}:{} unavailable, span export disabled: {}",
                telemetry.host, telemetry.port, e
            );
            None
        }
    }
}
