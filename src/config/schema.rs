//! Settings schema definitions.
//!
//! [`Settings`] is the single merged, validated configuration object used
//! process-wide. It is never mutated after construction.

use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;

use serde::Serialize;
use serde_json::Value;

/// Setting key names.
pub mod keys {
    pub const APP_NAME: &str = "APP_NAME";
    pub const HOST: &str = "HOST";
    pub const PORT: &str = "PORT";
    pub const LOGLEVEL: &str = "LOGLEVEL";
    pub const WORKERS: &str = "WORKERS";
    pub const THREADS: &str = "THREADS";
    pub const WORKER_CONNECTIONS: &str = "WORKER_CONNECTIONS";
    pub const DEBUG: &str = "DEBUG";
    pub const NEO4J_URL: &str = "NEO4J_URL";
    pub const NEO4J_USER: &str = "NEO4J_USER";
    pub const NEO4J_PASS: &str = "NEO4J_PASS";
    pub const NEO4J_DATABASE: &str = "NEO4J_DATABASE";
    pub const DATA_OPS_UTIL: &str = "DATA_OPS_UTIL";
    pub const DATAOPS: &str = "DATAOPS";
    pub const API_MODULES: &str = "API_MODULES";
    pub const CORS_ORIGINS: &str = "CORS_ORIGINS";
    pub const OPEN_TELEMETRY_ENABLED: &str = "OPEN_TELEMETRY_ENABLED";
    pub const OPEN_TELEMETRY_HOST: &str = "OPEN_TELEMETRY_HOST";
    pub const OPEN_TELEMETRY_PORT: &str = "OPEN_TELEMETRY_PORT";
    pub const METRICS_ENABLED: &str = "METRICS_ENABLED";
    pub const METRICS_ADDRESS: &str = "METRICS_ADDRESS";

    /// Every key bound to a declared field.
    pub const DECLARED: &[&str] = &[
        APP_NAME,
        HOST,
        PORT,
        LOGLEVEL,
        WORKERS,
        THREADS,
        WORKER_CONNECTIONS,
        DEBUG,
        NEO4J_URL,
        NEO4J_USER,
        NEO4J_PASS,
        NEO4J_DATABASE,
        DATA_OPS_UTIL,
        DATAOPS,
        API_MODULES,
        CORS_ORIGINS,
        OPEN_TELEMETRY_ENABLED,
        OPEN_TELEMETRY_HOST,
        OPEN_TELEMETRY_PORT,
        METRICS_ENABLED,
        METRICS_ADDRESS,
    ];

    pub fn is_declared(key: &str) -> bool {
        DECLARED.contains(&key)
    }
}

/// Field defaults, applied when no source provides a value.
pub mod defaults {
    pub const APP_NAME: &str = "service_neo4j";
    pub const HOST: &str = "0.0.0.0";
    pub const PORT: u16 = 5062;
    pub const LOGLEVEL: &str = "info";
    pub const WORKERS: usize = 4;
    pub const THREADS: usize = 2;
    pub const WORKER_CONNECTIONS: usize = 5;
    pub const DEBUG: bool = true;
    pub const NEO4J_DATABASE: &str = "neo4j";
    pub const API_MODULES: &[&str] = &["neo4j_api"];
    pub const CORS_ORIGINS: &[&str] = &[];
    pub const OPEN_TELEMETRY_ENABLED: bool = false;
    pub const OPEN_TELEMETRY_HOST: &str = "127.0.0.1";
    pub const OPEN_TELEMETRY_PORT: u16 = 6831;
    pub const METRICS_ENABLED: bool = false;
    pub const METRICS_ADDRESS: &str = "0.0.0.0:9090";
}

/// Accepted `LOGLEVEL` spellings.
pub const LOG_LEVELS: &[&str] = &[
    "trace", "debug", "info", "warn", "warning", "error", "critical",
];

/// URL schemes the graph HTTP API is reachable over.
pub const NEO4J_URL_SCHEMES: &[&str] = &["http", "https"];

/// Resolved service settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    /// Service name, also used as the secrets namespace default and span resource.
    pub app_name: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// Async runtime worker threads.
    pub workers: usize,
    /// Blocking pool threads.
    pub threads: usize,
    /// In-flight requests allowed per worker.
    pub worker_connections: usize,
    pub debug: bool,
    pub neo4j: Neo4jSettings,
    /// Data-operations utility path as configured.
    pub data_ops_util: String,
    /// Derived from `data_ops_util`.
    pub data_ops: String,
    pub api_modules: Vec<String>,
    /// Origins allowed to make credentialed cross-origin requests.
    pub cors_origins: Vec<String>,
    pub telemetry: TelemetrySettings,
    pub metrics: MetricsSettings,
    /// Undeclared keys from the secrets manager or programmatic source.
    pub extra: BTreeMap<String, Value>,
}

impl Settings {
    /// Bind address for the HTTP server.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `tracing` filter directive for the configured log level.
    pub fn log_filter(&self) -> &'static str {
        match self.log_level.to_ascii_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "warn" | "warning" => "warn",
            "error" | "critical" => "error",
            _ => "info",
        }
    }

    /// Upper bound on concurrently served requests.
    pub fn max_in_flight(&self) -> usize {
        self.workers.saturating_mul(self.worker_connections).max(1)
    }
}

/// Graph database connection settings.
#[derive(Clone, PartialEq, Serialize)]
pub struct Neo4jSettings {
    pub url: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub database: String,
}

impl fmt::Debug for Neo4jSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Neo4jSettings")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

/// Trace export settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySettings {
    /// Gates query instrumentation and span export.
    pub enabled: bool,
    /// Exporter agent host.
    pub host: String,
    /// Exporter agent port.
    pub port: u16,
}

/// Prometheus endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub address: SocketAddr,
}
