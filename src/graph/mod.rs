//! Graph database access subsystem.
//!
//! # Data Flow
//! ```text
//! application code
//!     → client.rs (GraphClient::run / Transaction::run)
//!     → QueryDispatch (current binding, swappable)
//!     → QueryRunner::run_in_tx
//!         pass-through: http.rs (Neo4j HTTP API)
//!         traced:       observability::tracing::TracedRunner → http.rs
//! ```
//!
//! # Design Decisions
//! - The query entry point is an injectable capability, not a patched method
//! - Transaction control is never intercepted
//! - Errors are values (`GraphError`) and cross every layer unchanged

pub mod client;
pub mod http;
pub mod runner;
pub mod types;

pub use client::{GraphClient, QueryDispatch, Release, Transaction};
pub use http::HttpGraphBackend;
pub use runner::{QueryRunner, TxControl};
pub use types::{GraphError, GraphResult, Params, Record, TxContext};
