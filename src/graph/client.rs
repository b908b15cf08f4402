//! Graph client and shared query dispatch.
//!
//! Every [`GraphClient`] clone and every [`Transaction`] it opens executes
//! queries through one [`QueryDispatch`]. Rebinding the dispatch therefore
//! affects all of them at once, which is what instrumentation relies on.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwap;

use crate::graph::runner::{QueryRunner, TxControl};
use crate::graph::types::{GraphError, GraphResult, Params, Record, TxContext};

struct Binding(Arc<dyn QueryRunner>);

/// A wrapper bound over the original runner.
struct Interception {
    original: Arc<dyn QueryRunner>,
    wrapper: Arc<dyn QueryRunner>,
}

/// Outcome of [`QueryDispatch::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Nothing was intercepted.
    NotIntercepted,
    /// The original runner is bound again.
    Restored,
    /// The binding is no longer the wrapper; nothing was changed.
    Replaced,
}

/// Atomically swappable binding of the query entry point.
///
/// At most one interception is installed per dispatch, whoever installs it.
pub struct QueryDispatch {
    binding: ArcSwap<Binding>,
    interception: Mutex<Option<Interception>>,
}

impl QueryDispatch {
    pub fn new(runner: Arc<dyn QueryRunner>) -> Self {
        Self {
            binding: ArcSwap::from_pointee(Binding(runner)),
            interception: Mutex::new(None),
        }
    }

    /// The runner queries currently go through.
    pub fn current(&self) -> Arc<dyn QueryRunner> {
        self.binding.load().0.clone()
    }

    /// Bind a new runner, returning the previous one.
    pub fn replace(&self, runner: Arc<dyn QueryRunner>) -> Arc<dyn QueryRunner> {
        let previous = self.binding.swap(Arc::new(Binding(runner)));
        previous.0.clone()
    }

    fn interception(&self) -> MutexGuard<'_, Option<Interception>> {
        self.interception.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind `wrap(current)` and remember the original.
    ///
    /// Returns `false` without calling `wrap` if an interception is already
    /// installed.
    pub fn intercept<F>(&self, wrap: F) -> bool
    where
        F: FnOnce(Arc<dyn QueryRunner>) -> Arc<dyn QueryRunner>,
    {
        let mut interception = self.interception();
        if interception.is_some() {
            return false;
        }

        let original = self.current();
        let wrapper = wrap(original.clone());
        self.replace(wrapper.clone());
        *interception = Some(Interception { original, wrapper });
        true
    }

    /// Rebind the original runner if the wrapper is still bound.
    pub fn release(&self) -> Release {
        let mut interception = self.interception();
        let Some(installed) = interception.as_ref() else {
            return Release::NotIntercepted;
        };
        if !Arc::ptr_eq(&self.current(), &installed.wrapper) {
            return Release::Replaced;
        }

        self.replace(installed.original.clone());
        *interception = None;
        Release::Restored
    }

    pub fn is_intercepted(&self) -> bool {
        self.interception().is_some()
    }

    async fn run(&self, tx: &TxContext, query: &str, params: &Params) -> GraphResult<Vec<Record>> {
        let runner = self.current();
        runner.run_in_tx(tx, query, params).await
    }
}

/// Client for the graph database.
#[derive(Clone)]
pub struct GraphClient {
    dispatch: Arc<QueryDispatch>,
    control: Arc<dyn TxControl>,
}

impl GraphClient {
    /// Client over a backend providing both capabilities.
    pub fn new<B>(backend: Arc<B>) -> Self
    where
        B: QueryRunner + TxControl,
    {
        let runner: Arc<dyn QueryRunner> = backend.clone();
        Self {
            dispatch: Arc::new(QueryDispatch::new(runner)),
            control: backend,
        }
    }

    pub fn from_parts(dispatch: Arc<QueryDispatch>, control: Arc<dyn TxControl>) -> Self {
        Self { dispatch, control }
    }

    /// The dispatch shared by this client and its clones.
    pub fn dispatch(&self) -> &Arc<QueryDispatch> {
        &self.dispatch
    }

    /// Run a query in its own autocommit transaction.
    pub async fn run(&self, query: &str, params: &Params) -> GraphResult<Vec<Record>> {
        self.dispatch.run(&TxContext::AutoCommit, query, params).await
    }

    /// Open an explicit transaction.
    pub async fn begin(&self) -> GraphResult<Transaction> {
        let ctx = self.control.begin().await?;
        Ok(Transaction {
            client: self.clone(),
            ctx,
            open: true,
        })
    }
}

/// An open explicit transaction.
///
/// Dropping it without commit or rollback leaves the server to expire it.
pub struct Transaction {
    client: GraphClient,
    ctx: TxContext,
    open: bool,
}

impl Transaction {
    pub fn context(&self) -> &TxContext {
        &self.ctx
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Run a query inside this transaction.
    pub async fn run(&self, query: &str, params: &Params) -> GraphResult<Vec<Record>> {
        if !self.open {
            return Err(GraphError::TransactionClosed);
        }
        self.client.dispatch.run(&self.ctx, query, params).await
    }

    pub async fn commit(&mut self) -> GraphResult<()> {
        if !self.open {
            return Err(GraphError::TransactionClosed);
        }
        self.open = false;
        self.client.control.commit(&self.ctx).await
    }

    pub async fn rollback(&mut self) -> GraphResult<()> {
        if !self.open {
            return Err(GraphError::TransactionClosed);
        }
        self.open = false;
        self.client.control.rollback(&self.ctx).await
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.open {
            tracing::warn!(tx = ?self.ctx, "Transaction dropped while open");
        }
    }
}
