//! Metrics collection and exposition.
//!
//! # Metrics
//! - `graph_queries_total` (counter): queries by outcome (`ok` or error kind)
//! - `graph_query_duration_seconds` (histogram): query latency
//! - `trace_spans_exported_total` (counter): spans delivered to the agent
//! - `trace_spans_dropped_total` (counter): spans dropped, by reason
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until a
//!   recorder is installed
//! - The Prometheus endpoint is opt-in (`METRICS_ENABLED`)

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus metrics exporter started");
    Ok(())
}

pub fn record_query(outcome: &'static str, started: Instant) {
    counter!("graph_queries_total", "outcome" => outcome).increment(1);
    histogram!("graph_query_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_spans_exported(count: usize) {
    counter!("trace_spans_exported_total").increment(count as u64);
}

pub fn record_spans_dropped(reason: &'static str, count: usize) {
    counter!("trace_spans_dropped_total", "reason" => reason).increment(count as u64);
}
