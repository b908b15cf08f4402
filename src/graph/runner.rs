//! Graph database capability contracts.
//!
//! [`QueryRunner`] is the single interceptable entry point: executing one
//! query inside a transaction context. Transaction control lives in a
//! separate trait so instrumentation never has to forward it.

use async_trait::async_trait;

use crate::graph::types::{GraphResult, Params, Record, TxContext};

/// Executes a query within a transaction context.
#[async_trait]
pub trait QueryRunner: Send + Sync + 'static {
    async fn run_in_tx(
        &self,
        tx: &TxContext,
        query: &str,
        params: &Params,
    ) -> GraphResult<Vec<Record>>;
}

/// Explicit transaction lifecycle.
#[async_trait]
pub trait TxControl: Send + Sync + 'static {
    async fn begin(&self) -> GraphResult<TxContext>;

    async fn commit(&self, tx: &TxContext) -> GraphResult<()>;

    async fn rollback(&self, tx: &TxContext) -> GraphResult<()>;
}
