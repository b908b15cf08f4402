//! Span export to a Jaeger agent.
//!
//! # Data Flow
//! ```text
//! span closes
//!     → tracing-opentelemetry layer (otel.name / otel.kind / otel.status_code)
//!     → BatchSpanProcessor (bounded queue, 512-span batches, 5s delay)
//!     → CountingExporter (exported / dropped counters)
//!     → Jaeger agent exporter (compact thrift over UDP)
//! ```
//!
//! # Design Decisions
//! - Export failures and queue overflow are logged at debug and counted,
//!   never propagated to the traced code
//! - Batches larger than one datagram are split by the agent exporter
//! - Teardown flushes queued spans off the async workers

use std::fmt;

use futures_util::future::BoxFuture;
use opentelemetry::global;
use opentelemetry::trace::{TraceError, TracerProvider as _};
use opentelemetry::KeyValue;
use opentelemetry_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
use opentelemetry_sdk::runtime;
use opentelemetry_sdk::trace::{self, Sampler, Tracer, TracerProvider};
use opentelemetry_sdk::Resource;

use crate::config::Settings;
use crate::observability::metrics;

/// Instrumentation scope reported with every span.
pub const TRACER_NAME: &str = "neo4j_service";

/// Largest UDP payload handed to the agent.
pub const MAX_PACKET_SIZE: usize = 65_000;

/// Wraps an exporter and counts what it delivers or loses.
#[derive(Debug)]
pub struct CountingExporter<E> {
    inner: E,
}

impl<E> CountingExporter<E> {
    pub fn new(inner: E) -> Self {
        Self { inner }
    }
}

impl<E: SpanExporter> SpanExporter for CountingExporter<E> {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        let count = batch.len();
        let export = self.inner.export(batch);
        Box::pin(async move {
            let result = export.await;
            match &result {
                Ok(()) => metrics::record_spans_exported(count),
                Err(err) => {
                    tracing::debug!(error = %err, spans = count, "Span export failed");
                    metrics::record_spans_dropped("export_failed", count);
                }
            }
            result
        })
    }

    fn shutdown(&mut self) {
        self.inner.shutdown();
    }
}

/// Running export pipeline. Dropping it without [`TraceExport::shutdown`]
/// loses queued spans.
pub struct TraceExport {
    provider: TracerProvider,
}

impl fmt::Debug for TraceExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceExport").finish_non_exhaustive()
    }
}

impl TraceExport {
    /// Batch spans into `exporter`. Must be called from within a Tokio runtime.
    pub fn new<E>(exporter: E, service: &str) -> Self
    where
        E: SpanExporter + 'static,
    {
        let provider = TracerProvider::builder()
            .with_config(
                trace::config()
                    .with_sampler(Sampler::AlwaysOn)
                    .with_resource(Resource::new([KeyValue::new(
                        "service.name",
                        service.to_string(),
                    )])),
            )
            .with_batch_exporter(CountingExporter::new(exporter), runtime::Tokio)
            .build();
        Self { provider }
    }

    /// Connect the pipeline to the agent named by the telemetry settings.
    pub fn jaeger(settings: &Settings) -> Result<Self, TraceError> {
        let telemetry = &settings.telemetry;
        let exporter = opentelemetry_jaeger::new_agent_pipeline()
            .with_endpoint(format!("{}:{}", telemetry.host, telemetry.port))
            .with_service_name(settings.app_name.clone())
            .with_max_packet_size(MAX_PACKET_SIZE)
            .with_auto_split_batch(true)
            .build_async_agent_exporter(runtime::Tokio)?;

        count_pipeline_errors();
        Ok(Self::new(exporter, &settings.app_name))
    }

    pub fn tracer(&self) -> Tracer {
        self.provider.tracer(TRACER_NAME)
    }

    /// Export everything still queued.
    pub async fn shutdown(self) {
        let provider = self.provider;
        let flushed = tokio::task::spawn_blocking(move || provider.force_flush()).await;
        match flushed {
            Ok(results) => {
                for err in results.into_iter().filter_map(Result::err) {
                    tracing::warn!(error = %err, "Span flush failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Span flush task failed"),
        }
    }
}

/// Route processor errors (full queue, closed channel) into logs and counters.
fn count_pipeline_errors() {
    let installed = global::set_error_handler(|err| match err {
        global::Error::Trace(err) => {
            tracing::debug!(error = %err, "Span pipeline error");
            metrics::record_spans_dropped("pipeline_error", 1);
        }
        other => tracing::debug!(error = %other, "OpenTelemetry error"),
    });
    if let Err(e) = installed {
        tracing::debug!(error = %e, "OpenTelemetry error handler not installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use opentelemetry::trace::{SpanKind, Status};
    use tracing_subscriber::layer::SubscriberExt;

    use crate::observability::tracing::query_span;

    #[derive(Clone, Debug, Default)]
    struct Collected {
        spans: Arc<Mutex<Vec<SpanData>>>,
    }

    impl SpanExporter for Collected {
        fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
            self.spans.lock().unwrap().extend(batch);
            Box::pin(async { Ok(()) })
        }
    }

    #[derive(Debug)]
    struct Unreachable;

    impl SpanExporter for Unreachable {
        fn export(&mut self, _: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
            Box::pin(async { Err(TraceError::from("agent unreachable")) })
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_batched_spans_are_flushed_on_shutdown() {
        let collected = Collected::default();
        let export = TraceExport::new(collected.clone(), "service_neo4j");
        let subscriber = tracing_subscriber::registry()
            .with(tracing_opentelemetry::layer().with_tracer(export.tracer()));

        tracing::subscriber::with_default(subscriber, || {
            let span = query_span("MATCH (n) RETURN n");
            span.record("otel.status_code", "ERROR");
            span.record("otel.status_message", "connection refused");
            drop(span);
            drop(query_span("RETURN 1"));
        });
        export.shutdown().await;

        let spans = collected.spans.lock().unwrap().clone();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].name, "MATCH (n) RETURN n");
        assert_eq!(spans[0].span_kind, SpanKind::Client);
        assert!(matches!(
            &spans[0].status,
            Status::Error { description } if description.contains("connection refused")
        ));
        assert_eq!(spans[1].name, "RETURN 1");
        assert_eq!(spans[1].status, Status::Unset);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_export_failure_stays_inside_pipeline() {
        let export = TraceExport::new(Unreachable, "service_neo4j");
        let subscriber = tracing_subscriber::registry()
            .with(tracing_opentelemetry::layer().with_tracer(export.tracer()));

        tracing::subscriber::with_default(subscriber, || drop(query_span("RETURN 1")));
        export.shutdown().await;
    }
}
