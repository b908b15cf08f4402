//! Raw configuration sources.
//!
//! A [`RawSource`] is one origin of key/value pairs. Keys are normalised to
//! upper case so lookups are case-insensitive, matching how environment
//! variables are usually spelled.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

/// Where a set of raw values came from.
///
/// Variants are declared in precedence order: later kinds override earlier
/// ones key-by-key during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceKind {
    /// Secrets manager (Vault). Lowest precedence.
    SecretsManager,
    /// `.env` file overlaid by the process environment.
    Environment,
    /// Values supplied by the embedding code.
    Programmatic,
    /// One file per key in the secrets directory. Highest precedence.
    FileSecrets,
}

impl SourceKind {
    /// All kinds, lowest precedence first.
    pub const PRECEDENCE: [SourceKind; 4] = [
        SourceKind::SecretsManager,
        SourceKind::Environment,
        SourceKind::Programmatic,
        SourceKind::FileSecrets,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::SecretsManager => "secrets_manager",
            SourceKind::Environment => "environment",
            SourceKind::Programmatic => "programmatic",
            SourceKind::FileSecrets => "file_secrets",
        }
    }

    /// Whether keys this source provides that are not declared settings are
    /// kept in [`Settings::extra`](crate::config::Settings::extra).
    ///
    /// Environment and file secrets only ever bind declared fields.
    pub fn retains_undeclared(self) -> bool {
        matches!(self, SourceKind::SecretsManager | SourceKind::Programmatic)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered, named mapping from key to raw value.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSource {
    kind: SourceKind,
    values: BTreeMap<String, Value>,
}

impl RawSource {
    /// Create an empty source.
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            values: BTreeMap::new(),
        }
    }

    /// Build a source from key/value pairs.
    pub fn from_pairs<I, K, V>(kind: SourceKind, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut source = Self::new(kind);
        for (key, value) in pairs {
            source.insert(key, value);
        }
        source
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl AsRef<str>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a value, replacing any previous value for the same key.
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<Value>) {
        self.values
            .insert(key.as_ref().to_ascii_uppercase(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(&key.to_ascii_uppercase())
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_case_insensitive() {
        let source = RawSource::new(SourceKind::Environment).with("neo4j_url", "http://db:7474");

        assert_eq!(
            source.get("NEO4J_URL"),
            Some(&Value::String("http://db:7474".into()))
        );
        assert_eq!(source.get("Neo4j_Url"), source.get("neo4j_url"));
    }

    #[test]
    fn test_later_insert_replaces_earlier() {
        let source = RawSource::from_pairs(
            SourceKind::Programmatic,
            [("PORT", Value::from(1)), ("port", Value::from(2))],
        );

        assert_eq!(source.len(), 1);
        assert_eq!(source.get("PORT"), Some(&Value::from(2)));
    }

    #[test]
    fn test_precedence_order_matches_declaration() {
        let mut sorted = SourceKind::PRECEDENCE;
        sorted.sort();
        assert_eq!(sorted, SourceKind::PRECEDENCE);
        assert!(SourceKind::FileSecrets > SourceKind::Environment);
    }
}
