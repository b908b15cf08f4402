//! Source merging and settings construction.
//!
//! Sources are merged key-by-key in [`SourceKind`] precedence order
//! (secrets manager, environment, programmatic, file secrets), so a key in a
//! later source always overrides the same key in an earlier one. The merged
//! values are then coerced into [`Settings`] and validated in one pass.

use std::collections::BTreeMap;
use std::net::{Ipv4Addr, SocketAddr};

use serde_json::Value;

use crate::config::loader::ConfigError;
use crate::config::schema::{
    defaults, keys, MetricsSettings, Neo4jSettings, Settings, TelemetrySettings, LOG_LEVELS,
    NEO4J_URL_SCHEMES,
};
use crate::config::source::{RawSource, SourceKind};
use crate::config::validation::FieldReader;

/// Merged view of all sources, remembering which source won each key.
#[derive(Debug, Clone, Default)]
pub struct MergedValues {
    values: BTreeMap<String, (Value, SourceKind)>,
}

impl MergedValues {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).map(|(value, _)| value)
    }

    /// Which source supplied the winning value for `key`.
    pub fn origin(&self, key: &str) -> Option<SourceKind> {
        self.values.get(key).map(|(_, kind)| *kind)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn undeclared(&self) -> BTreeMap<String, Value> {
        self.values
            .iter()
            .filter(|(key, (_, kind))| kind.retains_undeclared() && !keys::is_declared(key))
            .map(|(key, (value, _))| (key.clone(), value.clone()))
            .collect()
    }
}

/// Merge sources in precedence order.
///
/// Sources are stably sorted by kind first, so the caller's ordering only
/// matters between two sources of the same kind.
pub fn merge(sources: &[RawSource]) -> MergedValues {
    let mut ordered: Vec<&RawSource> = sources.iter().collect();
    ordered.sort_by_key(|source| source.kind());

    let mut merged = MergedValues::default();
    for source in ordered {
        let kind = source.kind();
        for (key, value) in source.iter() {
            // Environment and file secrets only bind declared fields.
            if !kind.retains_undeclared() && !keys::is_declared(key) {
                continue;
            }
            merged
                .values
                .insert(key.to_string(), (value.clone(), kind));
        }
    }
    merged
}

/// Produce validated settings from the given sources.
pub fn resolve(sources: &[RawSource]) -> Result<Settings, ConfigError> {
    let merged = merge(sources);
    let settings = build(&merged)?;

    tracing::debug!(
        app_name = %settings.app_name,
        keys = merged.len(),
        neo4j_url_origin = ?merged.origin(keys::NEO4J_URL),
        "Settings resolved"
    );
    Ok(settings)
}

fn build(merged: &MergedValues) -> Result<Settings, ConfigError> {
    let mut fields = FieldReader::new(merged);

    let app_name = fields.string(keys::APP_NAME, defaults::APP_NAME);
    let host = fields.string(keys::HOST, defaults::HOST);
    let port = fields.integer(keys::PORT, defaults::PORT);
    let log_level = fields.string(keys::LOGLEVEL, defaults::LOGLEVEL);
    fields.check(
        LOG_LEVELS.contains(&log_level.to_ascii_lowercase().as_str()),
        keys::LOGLEVEL,
        "a log level",
        &log_level,
    );
    let workers = fields.positive(keys::WORKERS, defaults::WORKERS);
    let threads = fields.positive(keys::THREADS, defaults::THREADS);
    let worker_connections = fields.positive(keys::WORKER_CONNECTIONS, defaults::WORKER_CONNECTIONS);
    let debug = fields.boolean(keys::DEBUG, defaults::DEBUG);

    let neo4j_url = fields.required_string(keys::NEO4J_URL);
    if !neo4j_url.is_empty() {
        if let Some(url) = fields.parsed::<url::Url>(keys::NEO4J_URL, "a URL", &neo4j_url) {
            fields.check(
                NEO4J_URL_SCHEMES.contains(&url.scheme()),
                keys::NEO4J_URL,
                "an http or https URL",
                &neo4j_url,
            );
        }
    }
    let neo4j = Neo4jSettings {
        url: neo4j_url,
        user: fields.required_string(keys::NEO4J_USER),
        password: fields.required_string(keys::NEO4J_PASS),
        database: fields.string(keys::NEO4J_DATABASE, defaults::NEO4J_DATABASE),
    };

    let data_ops_util = fields.required_string(keys::DATA_OPS_UTIL);
    let api_modules = fields.list(keys::API_MODULES, defaults::API_MODULES);
    let cors_origins = fields.list(keys::CORS_ORIGINS, defaults::CORS_ORIGINS);
    for origin in &cors_origins {
        let _ = fields.parsed::<url::Url>(keys::CORS_ORIGINS, "a list of origin URLs", origin);
    }

    let telemetry = TelemetrySettings {
        enabled: fields.boolean(keys::OPEN_TELEMETRY_ENABLED, defaults::OPEN_TELEMETRY_ENABLED),
        host: fields.string(keys::OPEN_TELEMETRY_HOST, defaults::OPEN_TELEMETRY_HOST),
        port: fields.integer(keys::OPEN_TELEMETRY_PORT, defaults::OPEN_TELEMETRY_PORT),
    };

    let metrics_enabled = fields.boolean(keys::METRICS_ENABLED, defaults::METRICS_ENABLED);
    let metrics_address = fields.string(keys::METRICS_ADDRESS, defaults::METRICS_ADDRESS);
    let metrics_address = fields
        .parsed::<SocketAddr>(keys::METRICS_ADDRESS, "a socket address", &metrics_address)
        .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, 9090)));

    fields.finish().map_err(ConfigError::Validation)?;

    Ok(Settings {
        app_name,
        host,
        port,
        log_level,
        workers,
        threads,
        worker_connections,
        debug,
        neo4j,
        data_ops: data_ops_util.clone(),
        data_ops_util,
        api_modules,
        cors_origins,
        telemetry,
        metrics: MetricsSettings {
            enabled: metrics_enabled,
            address: metrics_address,
        },
        extra: merged.undeclared(),
    })
}
