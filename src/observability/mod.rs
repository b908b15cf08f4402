//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! GraphClient::run / Transaction::run
//!     → QueryDispatch (TracedRunner installed by instrument.rs)
//!     → tracing.rs (one "graph.query" span per query)
//!     → exporter.rs (tracing-opentelemetry → batch processor → Jaeger agent)
//!
//! All subsystems also produce:
//!     → logging.rs (structured log events to stdout)
//!     → metrics.rs (counters and histograms, Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Instrumentation is switchable at runtime and restores the exact
//!   original query binding
//! - Span delivery never blocks or fails a query
//! - Metrics are cheap (atomic increments)

pub mod exporter;
pub mod instrument;
pub mod logging;
pub mod metrics;
pub mod tracing;

pub use exporter::{CountingExporter, TraceExport};
pub use instrument::{InstrumentationError, Instrumentor};
pub use logging::{bootstrap_subscriber, init_logging};
pub use self::metrics::init_metrics;
pub use self::tracing::{query_span, TracedRunner};
