//! Configuration loading from the four raw sources.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::config::resolver;
use crate::config::schema::Settings;
use crate::config::secrets::{SecretsManager, SourceUnavailableError, VaultClient};
use crate::config::source::{RawSource, SourceKind};
use crate::config::validation::{parse_bool, ErrorList, ValidationError};

/// Default secrets namespace when `APP_NAME` is unset.
pub const DEFAULT_NAMESPACE: &str = "dataset_neo4j";

/// Dotenv file read when no other path is given.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid settings: {}", ErrorList(.0))]
    Validation(Vec<ValidationError>),

    #[error(transparent)]
    SourceUnavailable(#[from] SourceUnavailableError),

    #[error("failed to read {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse env file {}: {}", .path.display(), .source)]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

/// Toggles read before resolution, from the process environment layered
/// over the dotenv file.
#[derive(Debug, Clone, Default)]
pub struct BootstrapEnv {
    /// Secrets namespace (`APP_NAME`).
    pub namespace: String,
    /// `CONFIG_CENTER_ENABLED`.
    pub secrets_enabled: bool,
    pub vault_url: Option<String>,
    /// CA bundle path for the vault connection.
    pub vault_crt: Option<PathBuf>,
    pub vault_token: Option<String>,
    /// File-secret directory.
    pub secrets_dir: Option<PathBuf>,
}

impl BootstrapEnv {
    /// Read toggles from the process environment and the default dotenv file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_file(Some(Path::new(DEFAULT_ENV_FILE)))
    }

    /// Read toggles from the process environment and `env_file`.
    pub fn from_env_file(env_file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::layered(env_file, |key| env::var(key).ok())
    }

    /// Read toggles through `lookup`, falling back to entries of `env_file`.
    pub fn layered<F>(env_file: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: HashMap<String, String> = match env_file {
            Some(path) => read_env_file(path)?.into_iter().collect(),
            None => HashMap::new(),
        };
        Self::from_lookup(|key| lookup(key).or_else(|| file.get(key).cloned()))
    }

    /// Read toggles through an arbitrary lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secrets_enabled = match lookup("CONFIG_CENTER_ENABLED") {
            None => false,
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                ConfigError::Validation(vec![ValidationError::Invalid {
                    key: "CONFIG_CENTER_ENABLED",
                    expected: "a boolean",
                    value: raw.clone(),
                }])
            })?,
        };

        Ok(Self {
            namespace: lookup("APP_NAME").unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            secrets_enabled,
            vault_url: lookup("VAULT_URL"),
            vault_crt: lookup("VAULT_CRT").map(PathBuf::from),
            vault_token: lookup("VAULT_TOKEN"),
            secrets_dir: lookup("SECRETS_DIR").map(PathBuf::from),
        })
    }
}

/// Collects the four raw sources and resolves them into [`Settings`].
pub struct SourceLoader {
    bootstrap: BootstrapEnv,
    env_file: Option<PathBuf>,
    env_vars: Option<Vec<(String, String)>>,
    programmatic: RawSource,
    secrets: Option<Arc<dyn SecretsManager>>,
}

impl SourceLoader {
    pub fn new(bootstrap: BootstrapEnv) -> Self {
        Self {
            bootstrap,
            env_file: Some(PathBuf::from(DEFAULT_ENV_FILE)),
            env_vars: None,
            programmatic: RawSource::new(SourceKind::Programmatic),
            secrets: None,
        }
    }

    /// Loader over the process environment and the default dotenv file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_file(Some(PathBuf::from(DEFAULT_ENV_FILE)))
    }

    /// Loader over the process environment and `env_file`, which also
    /// supplies the bootstrap toggles.
    pub fn from_env_file(env_file: Option<PathBuf>) -> Result<Self, ConfigError> {
        let bootstrap = BootstrapEnv::from_env_file(env_file.as_deref())?;
        Ok(Self::new(bootstrap).env_file(env_file))
    }

    /// Dotenv file layered under the process environment. `None` disables it.
    ///
    /// Bootstrap toggles are not re-read; see [`SourceLoader::from_env_file`].
    pub fn env_file(mut self, path: Option<PathBuf>) -> Self {
        self.env_file = path;
        self
    }

    /// Replace the process environment snapshot.
    pub fn env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Override the file-secret directory.
    pub fn secrets_dir(mut self, dir: Option<PathBuf>) -> Self {
        if dir.is_some() {
            self.bootstrap.secrets_dir = dir;
        }
        self
    }

    /// Add a programmatic value.
    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.programmatic.insert(key, value);
        self
    }

    /// Use a specific secrets manager instead of building a vault client.
    pub fn secrets_manager(mut self, manager: Arc<dyn SecretsManager>) -> Self {
        self.secrets = Some(manager);
        self
    }

    pub fn bootstrap(&self) -> &BootstrapEnv {
        &self.bootstrap
    }

    /// Load all four sources, lowest precedence first.
    pub fn load(&self) -> Result<Vec<RawSource>, ConfigError> {
        Ok(vec![
            self.load_secrets()?,
            self.load_environment()?,
            self.programmatic.clone(),
            self.load_file_secrets()?,
        ])
    }

    /// Load and resolve.
    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        resolver::resolve(&self.load()?)
    }

    fn load_secrets(&self) -> Result<RawSource, ConfigError> {
        let mut source = RawSource::new(SourceKind::SecretsManager);
        if !self.bootstrap.secrets_enabled {
            return Ok(source);
        }

        let namespace = &self.bootstrap.namespace;
        let manager: Arc<dyn SecretsManager> = match &self.secrets {
            Some(manager) => manager.clone(),
            None => Arc::new(self.vault_client()?),
        };

        let secrets = manager.fetch(namespace)?;
        tracing::info!(namespace = %namespace, keys = secrets.len(), "Loaded secrets");
        for (key, value) in secrets {
            source.insert(key, value);
        }
        Ok(source)
    }

    fn vault_client(&self) -> Result<VaultClient, SourceUnavailableError> {
        let namespace = &self.bootstrap.namespace;
        let url = self
            .bootstrap
            .vault_url
            .as_deref()
            .ok_or_else(|| SourceUnavailableError::new(namespace, "VAULT_URL is not set"))?;
        let token = self
            .bootstrap
            .vault_token
            .as_deref()
            .ok_or_else(|| SourceUnavailableError::new(namespace, "VAULT_TOKEN is not set"))?;

        VaultClient::new(url, self.bootstrap.vault_crt.as_deref(), token).map_err(|e| {
            SourceUnavailableError::new(namespace, e.reason)
        })
    }

    fn load_environment(&self) -> Result<RawSource, ConfigError> {
        let mut source = RawSource::new(SourceKind::Environment);

        if let Some(path) = &self.env_file {
            for (key, value) in read_env_file(path)? {
                source.insert(key, value);
            }
        }

        match &self.env_vars {
            Some(vars) => {
                for (key, value) in vars {
                    source.insert(key, value.clone());
                }
            }
            None => {
                for (key, value) in env::vars_os() {
                    if let (Some(key), Some(value)) = (key.to_str(), value.to_str()) {
                        source.insert(key, value);
                    }
                }
            }
        }

        Ok(source)
    }

    fn load_file_secrets(&self) -> Result<RawSource, ConfigError> {
        match &self.bootstrap.secrets_dir {
            Some(dir) => read_secrets_dir(dir),
            None => Ok(RawSource::new(SourceKind::FileSecrets)),
        }
    }
}

/// Entries of a dotenv file; a missing file has none.
fn read_env_file(path: &Path) -> Result<Vec<(String, String)>, ConfigError> {
    let env_err = |err: dotenvy::Error| ConfigError::EnvFile {
        path: path.to_path_buf(),
        source: err,
    };

    match dotenvy::from_path_iter(path) {
        Ok(entries) => entries.map(|entry| entry.map_err(env_err)).collect(),
        Err(dotenvy::Error::Io(err)) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(env_err(err)),
    }
}

/// Read one secret per regular file in `dir`.
fn read_secrets_dir(dir: &Path) -> Result<RawSource, ConfigError> {
    let mut source = RawSource::new(SourceKind::FileSecrets);
    let io_err = |err: io::Error| ConfigError::Io {
        path: dir.to_path_buf(),
        source: err,
    };

    if !dir.exists() {
        tracing::warn!(path = %dir.display(), "Secrets directory does not exist");
        return Ok(source);
    }
    if !dir.is_dir() {
        return Err(io_err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "secrets path is not a directory",
        )));
    }

    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(key) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let content = fs::read_to_string(&path).map_err(|err| ConfigError::Io {
            path: path.clone(),
            source: err,
        })?;
        source.insert(key, content.trim().to_string());
    }
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_defaults() {
        let bootstrap = BootstrapEnv::from_lookup(|_| None).unwrap();
        assert_eq!(bootstrap.namespace, DEFAULT_NAMESPACE);
        assert!(!bootstrap.secrets_enabled);
        assert!(bootstrap.secrets_dir.is_none());
    }

    #[test]
    fn test_bootstrap_reads_toggles() {
        let vars: HashMap<&str, &str> = [
            ("APP_NAME", "graph"),
            ("CONFIG_CENTER_ENABLED", "true"),
            ("VAULT_URL", "https://vault/v1/secret/data"),
        ]
        .into_iter()
        .collect();
        let bootstrap = BootstrapEnv::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(bootstrap.namespace, "graph");
        assert!(bootstrap.secrets_enabled);
        assert_eq!(bootstrap.vault_url.as_deref(), Some("https://vault/v1/secret/data"));
    }

    #[test]
    fn test_bootstrap_rejects_bad_toggle() {
        let result = BootstrapEnv::from_lookup(|k| (k == "CONFIG_CENTER_ENABLED").then(|| "sometimes".to_string()));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_enabled_without_vault_url_is_unavailable() {
        let bootstrap = BootstrapEnv {
            namespace: "graph".into(),
            secrets_enabled: true,
            ..Default::default()
        };
        let loader = SourceLoader::new(bootstrap)
            .env_file(None)
            .env_vars(Vec::<(String, String)>::new());

        match loader.load() {
            Err(ConfigError::SourceUnavailable(err)) => {
                assert_eq!(err.namespace, "graph");
                assert!(err.reason.contains("VAULT_URL"));
            }
            other => panic!("expected SourceUnavailable, got {:?}", other.map(|s| s.len())),
        }
    }

    #[test]
    fn test_bootstrap_toggles_fall_back_to_env_file() {
        let dir = std::env::temp_dir().join(format!("bootstrap-env-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let env_file = dir.join(".env");
        fs::write(&env_file, "CONFIG_CENTER_ENABLED=true\nAPP_NAME=from-file\nVAULT_URL=http://vault\n")
            .unwrap();

        let bootstrap = BootstrapEnv::layered(Some(&env_file), |k| {
            (k == "APP_NAME").then(|| "from-process".to_string())
        })
        .unwrap();

        assert!(bootstrap.secrets_enabled);
        assert_eq!(bootstrap.namespace, "from-process");
        assert_eq!(bootstrap.vault_url.as_deref(), Some("http://vault"));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_env_file_leaves_toggles_unset() {
        let missing = std::env::temp_dir().join("bootstrap-env-missing/.env");
        let bootstrap = BootstrapEnv::layered(Some(&missing), |_| None).unwrap();
        assert!(!bootstrap.secrets_enabled);
    }
}
