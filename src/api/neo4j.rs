//! Graph query routes.
//!
//! `POST /v1/neo4j/query` runs caller-supplied Cypher read-only: statements
//! containing a write clause are refused with 403 before reaching the graph.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::cypher;
use crate::graph::{GraphError, Params, Record};
use crate::http::server::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub params: Params,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub records: Vec<Record>,
}

#[derive(Debug, Serialize)]
pub struct GraphHealth {
    pub status: &'static str,
    pub database: String,
}

pub fn routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/v1/neo4j/query", post(run_query))
        .route("/v1/neo4j/health", get(graph_health))
}

async fn run_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    if let Some(clause) = cypher::write_clause(&request.query) {
        return Err(ApiError::ReadOnly { clause });
    }
    let records = state.graph.run(&request.query, &request.params).await?;
    tracing::debug!(records = records.len(), "Query completed");
    Ok(Json(QueryResponse { records }))
}

async fn graph_health(State(state): State<AppState>) -> Result<Json<GraphHealth>, ApiError> {
    state.graph.run("RETURN 1 AS ok", &Params::new()).await?;
    Ok(Json(GraphHealth {
        status: "ok",
        database: state.settings.neo4j.database.clone(),
    }))
}

/// Maps request and graph errors onto HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// The statement contains a write clause.
    ReadOnly { clause: &'static str },
    Graph(GraphError),
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        Self::Graph(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::ReadOnly { .. } => StatusCode::FORBIDDEN,
            Self::Graph(GraphError::ConnectionRefused(_) | GraphError::Transport(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Graph(GraphError::Database { .. }) => StatusCode::BAD_REQUEST,
            Self::Graph(GraphError::Protocol(_) | GraphError::TransactionClosed) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::ReadOnly { .. } => "read_only",
            Self::Graph(err) => err.kind(),
        }
    }

    fn message(&self) -> String {
        match self {
            Self::ReadOnly { clause } => format!("{} clauses are not allowed on this route", clause),
            Self::Graph(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self.message(), kind = self.kind(), "Graph request failed");
        } else if let Self::ReadOnly { clause } = &self {
            tracing::debug!(clause = *clause, "Write query refused");
        }
        let body = serde_json::json!({
            "error": self.kind(),
            "message": self.message(),
        });
        (status, Json(body)).into_response()
    }
}
