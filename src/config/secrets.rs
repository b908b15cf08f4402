//! Secrets-manager integration.
//!
//! # Responsibilities
//! - Fetch the key/value secrets stored under the service namespace
//! - Surface network and auth failures as [`SourceUnavailableError`]
//!
//! # Design Decisions
//! - Blocking HTTP client: settings resolve before the async runtime starts
//! - A namespace with no secrets (404) is an empty mapping, not a failure
//! - The token is never logged

use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::{Map, Value};
use thiserror::Error;

/// The secrets manager could not be queried while enabled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("secrets manager unavailable for namespace `{namespace}`: {reason}")]
pub struct SourceUnavailableError {
    pub namespace: String,
    pub reason: String,
}

impl SourceUnavailableError {
    pub fn new(namespace: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            reason: reason.into(),
        }
    }
}

/// Capability to fetch a namespace's secrets.
pub trait SecretsManager: Send + Sync {
    fn fetch(&self, namespace: &str) -> Result<Map<String, Value>, SourceUnavailableError>;
}

/// Vault KV v2 client.
///
/// `base_url` points at the KV data mount, e.g.
/// `https://vault:8200/v1/secret/data`; secrets are read from
/// `{base_url}/{namespace}`.
pub struct VaultClient {
    base_url: String,
    token: String,
    http: Client,
}

impl VaultClient {
    const TIMEOUT: Duration = Duration::from_secs(10);

    /// Build a client, optionally trusting a custom CA bundle (PEM).
    pub fn new(
        base_url: &str,
        ca_cert: Option<&Path>,
        token: &str,
    ) -> Result<Self, SourceUnavailableError> {
        let mut builder = Client::builder().timeout(Self::TIMEOUT);

        if let Some(path) = ca_cert {
            let pem = fs::read(path).map_err(|e| {
                SourceUnavailableError::new("", format!("cannot read CA bundle {}: {}", path.display(), e))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| SourceUnavailableError::new("", format!("invalid CA bundle: {}", e)))?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder
            .build()
            .map_err(|e| SourceUnavailableError::new("", format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            http,
        })
    }
}

impl SecretsManager for VaultClient {
    fn fetch(&self, namespace: &str) -> Result<Map<String, Value>, SourceUnavailableError> {
        let url = format!("{}/{}", self.base_url, namespace);
        let unavailable = |reason: String| SourceUnavailableError::new(namespace, reason);

        let response = self
            .http
            .get(&url)
            .header("X-Vault-Token", &self.token)
            .send()
            .map_err(|e| unavailable(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                tracing::warn!(namespace = %namespace, "No secrets stored for namespace");
                return Ok(Map::new());
            }
            status if !status.is_success() => {
                return Err(unavailable(format!("vault returned status {}", status)));
            }
            _ => {}
        }

        let body: Value = response
            .json()
            .map_err(|e| unavailable(format!("malformed vault response: {}", e)))?;
        Ok(extract_secrets(body))
    }
}

/// Pull the secret map out of a KV v2 (`data.data`) or KV v1 (`data`) body.
fn extract_secrets(body: Value) -> Map<String, Value> {
    let Value::Object(mut root) = body else {
        return Map::new();
    };
    let Some(Value::Object(mut data)) = root.remove("data") else {
        return Map::new();
    };
    if data.contains_key("metadata") {
        return match data.remove("data") {
            Some(Value::Object(inner)) => inner,
            _ => Map::new(),
        };
    }
    data
}
