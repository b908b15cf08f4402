//! Query instrumentation controller.
//!
//! # State Machine
//! ```text
//! Uninstalled --instrument()--> Installed (TracedRunner bound over original)
//! Installed   --uninstrument()--> Uninstalled (original rebound)
//! ```
//!
//! The state lives in the [`QueryDispatch`], so every controller over one
//! dispatch sees the same flag. Repeated `instrument()` or `uninstrument()`
//! calls are no-ops, whichever controller makes them.

use std::sync::Arc;

use thiserror::Error;

use crate::graph::{QueryDispatch, QueryRunner, Release};
use crate::observability::tracing::TracedRunner;

/// Instrumentation invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstrumentationError {
    /// The dispatch was rebound by someone else while instrumented.
    #[error("query dispatch no longer holds the installed wrapper; refusing to restore")]
    BindingReplaced,
}

/// Installs and removes [`TracedRunner`] around a [`QueryDispatch`].
pub struct Instrumentor {
    dispatch: Arc<QueryDispatch>,
}

impl Instrumentor {
    pub fn new(dispatch: Arc<QueryDispatch>) -> Self {
        Self { dispatch }
    }

    /// Wrap the current binding. Returns `false` if already installed.
    pub fn instrument(&self) -> bool {
        let installed = self.dispatch.intercept(|original| {
            let wrapper: Arc<dyn QueryRunner> = Arc::new(TracedRunner::new(original));
            wrapper
        });
        if installed {
            tracing::info!("Graph query instrumentation installed");
        }
        installed
    }

    /// Restore the original binding. Returns `false` if not installed.
    pub fn uninstrument(&self) -> Result<bool, InstrumentationError> {
        match self.dispatch.release() {
            Release::NotIntercepted => Ok(false),
            Release::Restored => {
                tracing::info!("Graph query instrumentation removed");
                Ok(true)
            }
            Release::Replaced => {
                tracing::error!("Query dispatch was rebound while instrumented");
                Err(InstrumentationError::BindingReplaced)
            }
        }
    }

    pub fn is_instrumented(&self) -> bool {
        self.dispatch.is_intercepted()
    }
}
