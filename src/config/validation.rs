//! Settings validation and type coercion.
//!
//! # Responsibilities
//! - Coerce raw values (JSON or strings) into typed settings fields
//! - Report missing required fields and malformed values
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Blank strings count as missing for required fields

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

use crate::config::resolver::MergedValues;

/// A single missing or malformed setting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required setting `{key}`")]
    Missing { key: &'static str },

    #[error("setting `{key}` expects {expected}, got `{value}`")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

impl ValidationError {
    pub fn key(&self) -> &'static str {
        match self {
            ValidationError::Missing { key } | ValidationError::Invalid { key, .. } => key,
        }
    }
}

/// Display adapter for a list of validation errors.
pub(crate) struct ErrorList<'a>(pub &'a [ValidationError]);

impl fmt::Display for ErrorList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

/// Reads typed fields out of merged values, accumulating errors.
pub(crate) struct FieldReader<'a> {
    merged: &'a MergedValues,
    errors: Vec<ValidationError>,
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(merged: &'a MergedValues) -> Self {
        Self {
            merged,
            errors: Vec::new(),
        }
    }

    fn invalid(&mut self, key: &'static str, expected: &'static str, value: &Value) {
        self.errors.push(ValidationError::Invalid {
            key,
            expected,
            value: display_raw(value),
        });
    }

    pub(crate) fn string(&mut self, key: &'static str, default: &str) -> String {
        match self.merged.get(key) {
            None => default.to_string(),
            Some(value) => match coerce_string(value) {
                Some(s) => s,
                None => {
                    self.invalid(key, "a string", value);
                    default.to_string()
                }
            },
        }
    }

    pub(crate) fn required_string(&mut self, key: &'static str) -> String {
        match self.merged.get(key) {
            None => {
                self.errors.push(ValidationError::Missing { key });
                String::new()
            }
            Some(value) => match coerce_string(value) {
                Some(s) if s.trim().is_empty() => {
                    self.errors.push(ValidationError::Missing { key });
                    String::new()
                }
                Some(s) => s,
                None => {
                    self.invalid(key, "a string", value);
                    String::new()
                }
            },
        }
    }

    pub(crate) fn integer<T>(&mut self, key: &'static str, default: T) -> T
    where
        T: TryFrom<i64>,
    {
        let Some(value) = self.merged.get(key) else {
            return default;
        };
        match coerce_i64(value).and_then(|n| T::try_from(n).ok()) {
            Some(n) => n,
            None => {
                self.invalid(key, "an integer in range", value);
                default
            }
        }
    }

    /// Like [`integer`](Self::integer) but rejects zero.
    pub(crate) fn positive(&mut self, key: &'static str, default: usize) -> usize {
        let n = self.integer(key, default);
        if n == 0 {
            self.errors.push(ValidationError::Invalid {
                key,
                expected: "a positive integer",
                value: "0".to_string(),
            });
            return default;
        }
        n
    }

    pub(crate) fn boolean(&mut self, key: &'static str, default: bool) -> bool {
        let Some(value) = self.merged.get(key) else {
            return default;
        };
        match coerce_bool(value) {
            Some(b) => b,
            None => {
                self.invalid(key, "a boolean", value);
                default
            }
        }
    }

    pub(crate) fn list(&mut self, key: &'static str, default: &[&str]) -> Vec<String> {
        let Some(value) = self.merged.get(key) else {
            return default.iter().map(|s| s.to_string()).collect();
        };
        match coerce_list(value) {
            Some(items) => items,
            None => {
                self.invalid(key, "a list of strings", value);
                default.iter().map(|s| s.to_string()).collect()
            }
        }
    }

    /// Parse a string-valued field with [`FromStr`].
    pub(crate) fn parsed<T: FromStr>(
        &mut self,
        key: &'static str,
        expected: &'static str,
        raw: &str,
    ) -> Option<T> {
        match raw.parse::<T>() {
            Ok(v) => Some(v),
            Err(_) => {
                self.errors.push(ValidationError::Invalid {
                    key,
                    expected,
                    value: raw.to_string(),
                });
                None
            }
        }
    }

    pub(crate) fn check(&mut self, ok: bool, key: &'static str, expected: &'static str, raw: &str) {
        if !ok {
            self.errors.push(ValidationError::Invalid {
                key,
                expected,
                value: raw.to_string(),
            });
        }
    }

    pub(crate) fn finish(self) -> Result<(), Vec<ValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

fn display_raw(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => parse_bool(s),
        _ => None,
    }
}

/// Parse the usual truthy/falsy spellings.
pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

pub(crate) fn coerce_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.starts_with('[') {
                serde_json::from_str::<Vec<String>>(trimmed).ok()
            } else {
                Some(
                    trimmed
                        .split(',')
                        .map(str::trim)
                        .filter(|item| !item.is_empty())
                        .map(str::to_string)
                        .collect(),
                )
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_coercion() {
        assert_eq!(coerce_i64(&json!(5062)), Some(5062));
        assert_eq!(coerce_i64(&json!(" 5062 ")), Some(5062));
        assert_eq!(coerce_i64(&json!("50x")), None);
        assert_eq!(coerce_i64(&json!(1.5)), None);
    }

    #[test]
    fn test_bool_coercion() {
        assert_eq!(coerce_bool(&json!("TRUE")), Some(true));
        assert_eq!(coerce_bool(&json!("off")), Some(false));
        assert_eq!(coerce_bool(&json!(1)), Some(true));
        assert_eq!(coerce_bool(&json!("maybe")), None);
    }

    #[test]
    fn test_list_coercion() {
        assert_eq!(
            coerce_list(&json!(r#"["neo4j_api", "other"]"#)),
            Some(vec!["neo4j_api".to_string(), "other".to_string()])
        );
        assert_eq!(
            coerce_list(&json!("neo4j_api, other,")),
            Some(vec!["neo4j_api".to_string(), "other".to_string()])
        );
        assert_eq!(coerce_list(&json!(["a", 1])), None);
    }

    #[test]
    fn test_error_list_display() {
        let errors = vec![
            ValidationError::Missing { key: "NEO4J_URL" },
            ValidationError::Invalid {
                key: "PORT",
                expected: "an integer in range",
                value: "abc".into(),
            },
        ];
        assert_eq!(
            ErrorList(&errors).to_string(),
            "missing required setting `NEO4J_URL`, setting `PORT` expects an integer in range, got `abc`"
        );
    }
}
