//! Query span wrapper.
//!
//! [`TracedRunner`] wraps a [`QueryRunner`] so every query produces exactly
//! one span. The span is named by the query text (`otel.name`) with kind
//! `client`, is attached to the delegated future, and closes when that
//! future completes or is dropped. Arguments, results and errors pass
//! through untouched.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::field::{display, Empty};
use tracing::{Instrument, Span};

use crate::graph::{GraphResult, Params, QueryRunner, Record, TxContext};
use crate::observability::metrics;

/// Target for query spans.
pub const QUERY_SPAN_TARGET: &str = "neo4j_service::graph";

/// Span kind for calls out to a collaborating system.
pub const SPAN_KIND_CLIENT: &str = "client";

/// Runner that records one span per query and delegates to `inner`.
pub struct TracedRunner {
    inner: Arc<dyn QueryRunner>,
}

impl TracedRunner {
    pub fn new(inner: Arc<dyn QueryRunner>) -> Self {
        Self { inner }
    }

    /// The wrapped runner.
    pub fn inner(&self) -> &Arc<dyn QueryRunner> {
        &self.inner
    }
}

/// Span for one query; the query text is used verbatim as its label.
pub fn query_span(query: &str) -> Span {
    tracing::info_span!(
        target: QUERY_SPAN_TARGET,
        "graph.query",
        otel.name = %query,
        otel.kind = SPAN_KIND_CLIENT,
        db.system = "neo4j",
        otel.status_code = Empty,
        otel.status_message = Empty,
    )
}

#[async_trait]
impl QueryRunner for TracedRunner {
    async fn run_in_tx(
        &self,
        tx: &TxContext,
        query: &str,
        params: &Params,
    ) -> GraphResult<Vec<Record>> {
        let span = query_span(query);
        let started = Instant::now();

        let result = self
            .inner
            .run_in_tx(tx, query, params)
            .instrument(span.clone())
            .await;

        match &result {
            Ok(_) => metrics::record_query("ok", started),
            Err(err) => {
                span.record("otel.status_code", "ERROR");
                span.record("otel.status_message", display(err));
                metrics::record_query(err.kind(), started);
            }
        }
        result
    }
}
