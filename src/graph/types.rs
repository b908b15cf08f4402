//! Graph query types and errors.

use serde_json::{Map, Value};
use thiserror::Error;

/// Query parameters, bound by name.
pub type Params = Map<String, Value>;

/// One result row, keyed by column name.
pub type Record = Map<String, Value>;

pub type GraphResult<T> = Result<T, GraphError>;

/// Errors returned by the graph database capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The database endpoint refused the connection.
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// Any other network failure (timeout, reset, TLS).
    #[error("transport error: {0}")]
    Transport(String),

    /// The database rejected the statement.
    #[error("{code}: {message}")]
    Database { code: String, message: String },

    /// The response could not be understood.
    #[error("unexpected response: {0}")]
    Protocol(String),

    /// The transaction was already committed or rolled back.
    #[error("transaction already closed")]
    TransactionClosed,
}

impl GraphError {
    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GraphError::ConnectionRefused(_) => "connection_refused",
            GraphError::Transport(_) => "transport",
            GraphError::Database { .. } => "database",
            GraphError::Protocol(_) => "protocol",
            GraphError::TransactionClosed => "transaction_closed",
        }
    }
}

/// Transaction context a query executes in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxContext {
    /// Single-statement transaction committed by the server.
    AutoCommit,
    /// Open explicit transaction, identified by its server location.
    Explicit { location: String },
}
