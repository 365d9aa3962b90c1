//! Configuration properties
//!
//! Gatehouse components read their settings through a string-valued property
//! provider so the hosting application decides where configuration actually
//! lives. Malformed numeric values fall back to compiled-in defaults instead
//! of failing the caller.

use crate::error::{ErrorContext, GatehouseError, GatehouseResult};
use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

/// Source of string-valued configuration properties.
pub trait PropertyProvider: Send + Sync {
    /// Look up a property by name. Absent keys return `None`.
    fn get_property(&self, name: &str) -> Option<String>;
}

/// In-memory property provider backed by a plain map.
#[derive(Debug, Clone, Default)]
pub struct MapProperties {
    values: HashMap<String, String>,
}

impl MapProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.values.insert(name.to_string(), value.to_string());
        self
    }

    pub fn insert(&mut self, name: &str, value: &str) {
        self.values.insert(name.to_string(), value.to_string());
    }
}

impl PropertyProvider for MapProperties {
    fn get_property(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

/// Property provider loaded from a TOML file.
///
/// Only top-level scalar entries are exposed; numbers and booleans are
/// stringified so every value travels the same way.
#[derive(Debug, Clone)]
pub struct TomlProperties {
    values: HashMap<String, String>,
}

impl TomlProperties {
    pub fn from_file<P: AsRef<Path>>(path: P) -> GatehouseResult<Self> {
        let content =
            std::fs::read_to_string(&path).map_err(|e| GatehouseError::Config {
                message: format!("Failed to read config file: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("config")
                    .with_operation("read_file")
                    .with_suggestion("Check if the config file exists and is readable"),
            })?;

        Self::from_str(&content)
    }

    pub fn from_str(content: &str) -> GatehouseResult<Self> {
        let value: toml::Value = toml::from_str(content).map_err(|e| GatehouseError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        let mut values = HashMap::new();
        if let toml::Value::Table(table) = value {
            for (name, entry) in table {
                let rendered = match entry {
                    toml::Value::String(s) => s,
                    toml::Value::Integer(i) => i.to_string(),
                    toml::Value::Float(f) => f.to_string(),
                    toml::Value::Boolean(b) => b.to_string(),
                    // tables and arrays are not addressable as flat properties
                    _ => continue,
                };
                values.insert(name, rendered);
            }
        }

        Ok(Self { values })
    }
}

impl PropertyProvider for TomlProperties {
    fn get_property(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

/// Parse a numeric property, falling back to `default` on absent, empty or
/// malformed input. Parse failures are logged and never surfaced.
pub fn parse_or_default<T>(value: Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Display,
{
    let Some(raw) = value else {
        return default;
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return default;
    }
    match raw.parse::<T>() {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!(
                "Invalid value {:?} for property {}, using default {}",
                raw, key, default
            );
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_properties_round_trip() {
        let properties = MapProperties::new()
            .with("session_timeout", "300")
            .with("session_token_label", "token");

        assert_eq!(
            properties.get_property("session_timeout").as_deref(),
            Some("300")
        );
        assert_eq!(properties.get_property("missing"), None);
    }

    #[test]
    fn parse_or_default_recovers_from_bad_input() {
        assert_eq!(parse_or_default::<i64>(None, "k", 7), 7);
        assert_eq!(parse_or_default(Some("".to_string()), "k", 7i64), 7);
        assert_eq!(parse_or_default(Some("abc".to_string()), "k", 7i64), 7);
        assert_eq!(parse_or_default(Some("-1".to_string()), "k", 7i64), -1);
        assert_eq!(parse_or_default(Some(" 42 ".to_string()), "k", 7i64), 42);
    }

    #[test]
    fn toml_properties_flatten_scalars() {
        let properties = TomlProperties::from_str(
            r#"
            session_token_label = "sid"
            session_timeout = 600
            verbose = true

            [ignored_table]
            nested = 1
            "#,
        )
        .unwrap();

        assert_eq!(
            properties.get_property("session_token_label").as_deref(),
            Some("sid")
        );
        assert_eq!(properties.get_property("session_timeout").as_deref(), Some("600"));
        assert_eq!(properties.get_property("verbose").as_deref(), Some("true"));
        assert_eq!(properties.get_property("nested"), None);
    }

    #[test]
    fn toml_properties_reject_bad_syntax() {
        let err = TomlProperties::from_str("not = = toml").unwrap_err();
        assert!(matches!(err, GatehouseError::Config { .. }));
    }
}
