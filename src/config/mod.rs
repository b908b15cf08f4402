//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! bootstrap toggles (CONFIG_CENTER_ENABLED, VAULT_*, SECRETS_DIR)
//!     → loader.rs collects four raw sources:
//!         secrets.rs (vault)   lowest precedence
//!         .env + process env
//!         programmatic values
//!         secrets directory    highest precedence
//!     → resolver.rs (merge key-by-key, coerce, derive DATAOPS)
//!     → validation.rs (collect every missing/malformed field)
//!     → Settings (validated, immutable)
//!     → cache.rs (resolved once per process, shared via Arc)
//! ```
//!
//! # Design Decisions
//! - A disabled secrets manager contributes an empty source rather than
//!   being skipped, so merging is uniform
//! - Settings are immutable once resolved; there is no invalidation
//! - Failed resolution is retried on the next call, never cached

pub mod cache;
pub mod loader;
pub mod resolver;
pub mod schema;
pub mod secrets;
pub mod source;
pub mod validation;

pub use cache::{get_settings, get_settings_with, SettingsCache};
pub use loader::{BootstrapEnv, ConfigError, SourceLoader};
pub use resolver::resolve;
pub use schema::{MetricsSettings, Neo4jSettings, Settings, TelemetrySettings};
pub use secrets::{SecretsManager, SourceUnavailableError, VaultClient};
pub use source::{RawSource, SourceKind};
pub use validation::ValidationError;
