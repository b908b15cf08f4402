//! Neo4j data-access service.
//!
//! Two subsystems carry the weight:
//! - [`config`]: layered settings resolution (secrets manager, environment,
//!   programmatic values, file secrets) cached once per process
//! - [`observability`]: switchable query instrumentation that turns every
//!   graph query into a span and exports it to a trace agent
//!
//! [`graph`], [`http`], [`api`] and [`lifecycle`] are the glue around them.

pub mod api;
pub mod config;
pub mod graph;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::{get_settings, get_settings_with, Settings, SourceLoader};
pub use graph::GraphClient;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use observability::Instrumentor;
