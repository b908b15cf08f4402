//! Structured logging.
//!
//! # Design Decisions
//! - One global subscriber: `EnvFilter` → fmt layer → optional OpenTelemetry layer
//! - `RUST_LOG` wins over `LOGLEVEL` when set
//! - Installation fails (rather than panics) if a subscriber already exists
//! - Before settings exist, a scoped stderr subscriber carries bootstrap events

use opentelemetry_sdk::trace::Tracer;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

/// Filter used until `LOGLEVEL` has been resolved.
pub const BOOTSTRAP_FILTER: &str = "info";

/// Install the global subscriber.
pub fn init_logging(settings: &Settings, tracer: Option<Tracer>) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_filter()));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(settings.debug))
        .with(tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer)))
        .try_init()
}

/// Subscriber for settings resolution, writing to stderr.
///
/// Meant for `tracing::subscriber::with_default`, never installed globally.
pub fn bootstrap_subscriber() -> impl Subscriber + Send + Sync + 'static {
    bootstrap_subscriber_with(std::io::stderr)
}

pub fn bootstrap_subscriber_with<W>(writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(BOOTSTRAP_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(writer)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_bootstrap_subscriber_reports_warnings() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = bootstrap_subscriber_with(move || writer.clone());

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(path = "/run/secrets", "Secrets directory does not exist");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Secrets directory does not exist"));
        assert!(output.contains("/run/secrets"));
    }
}
