//! Client configuration.
//!
//! [`Config`] is a tree of values addressed by dotted keys
//! (`libstorage.client.tls.certFile`). It can be loaded from TOML, built in
//! code, and overridden from the environment. Lookups through a
//! [`scope`](Config::scope) fall back toward the root, so a key that is not
//! set under `libstorage.client` is also searched under `libstorage` and at
//! the top level.
//!
//! # Example
//!
//! ```
//! use libstorage_client::Config;
//!
//! let config = Config::from_toml_str(r#"
//!     [libstorage]
//!     host = "unix:///var/run/libstorage/localhost.sock"
//!
//!     [libstorage.client.tls]
//!     serverName = "storage.example.com"
//! "#).unwrap();
//!
//! assert_eq!(
//!     config.get_string("libstorage.host").as_deref(),
//!     Some("unix:///var/run/libstorage/localhost.sock"),
//! );
//!
//! let client = config.scope("libstorage.client");
//! assert_eq!(
//!     client.get_string("tls.serverName").as_deref(),
//!     Some("storage.example.com"),
//! );
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use toml::{Table, Value};

use crate::{ClientError, Result};

/// Endpoint of the libStorage service, e.g. `tcp://127.0.0.1:7979`.
pub const HOST: &str = "libstorage.host";

/// Scope holding the client settings, including the `tls` sub-scope.
pub const CLIENT_SCOPE: &str = "libstorage.client";

/// Dump outgoing requests to the diagnostic sink.
pub const LOG_REQUESTS: &str = "libstorage.client.http.logging.logrequest";

/// Dump incoming responses to the diagnostic sink.
pub const LOG_RESPONSES: &str = "libstorage.client.http.logging.logresponse";

/// File scanned by [`Client::local_devices`](crate::Client::local_devices).
pub const LOCAL_DEVICES_FILE: &str = "libstorage.client.localdevicesfile";

/// Used when [`LOCAL_DEVICES_FILE`] is not configured.
pub const DEFAULT_LOCAL_DEVICES_FILE: &str = "/proc/partitions";

/// Layered configuration with dotted-key lookups.
#[derive(Debug, Clone, Default)]
pub struct Config {
    values: Arc<Table>,
    /// Environment snapshot keyed by variable name.
    env: Arc<BTreeMap<String, String>>,
    /// Key segments this view is scoped to.
    scope: Vec<String>,
}

impl Config {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let values: Table = toml::from_str(s)
            .map_err(|e| ClientError::Config(format!("malformed configuration: {}", e)))?;
        Ok(Self {
            values: Arc::new(values),
            ..Self::default()
        })
    }

    /// Load a configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!(
                "failed to read configuration file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&text)
    }

    /// Overlay the current process environment.
    ///
    /// A key `a.b.c` is overridden by the variable `A_B_C`.
    pub fn with_env(self) -> Self {
        self.with_env_vars(std::env::vars())
    }

    /// Overlay the given variables as if they were the environment.
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let env = Arc::make_mut(&mut self.env);
        env.extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set a value, creating intermediate tables as needed.
    ///
    /// The key is resolved relative to this view's scope.
    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        let full = self.qualify(key);
        let segments: Vec<&str> = full.split('.').filter(|s| !s.is_empty()).collect();
        let Some((last, parents)) = segments.split_last() else {
            return self;
        };

        let mut table = Arc::make_mut(&mut self.values);
        for segment in parents {
            let name = existing_key(table, segment).unwrap_or_else(|| segment.to_string());
            let entry = table
                .entry(name)
                .or_insert_with(|| Value::Table(Table::new()));
            if !entry.is_table() {
                *entry = Value::Table(Table::new());
            }
            let Value::Table(next) = entry else {
                return self;
            };
            table = next;
        }
        let name = existing_key(table, last).unwrap_or_else(|| last.to_string());
        table.insert(name, value.into());
        self
    }

    /// Return a view of this configuration scoped to `prefix`.
    pub fn scope(&self, prefix: &str) -> Config {
        let mut scoped = self.clone();
        scoped
            .scope
            .extend(prefix.split('.').filter(|s| !s.is_empty()).map(String::from));
        scoped
    }

    /// Look up a string value.
    ///
    /// Numbers and booleans are rendered as strings; tables and arrays are
    /// not strings and yield `None`.
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.lookup(key)? {
            Value::String(s) => Some(s),
            Value::Integer(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Boolean(b) => Some(b.to_string()),
            Value::Datetime(d) => Some(d.to_string()),
            Value::Array(_) | Value::Table(_) => None,
        }
    }

    /// Look up a boolean value. Absent or unparseable values are `false`.
    pub fn get_bool(&self, key: &str) -> bool {
        match self.lookup(key) {
            Some(Value::Boolean(b)) => b,
            Some(Value::Integer(i)) => i != 0,
            Some(Value::String(s)) => parse_bool(&s),
            _ => false,
        }
    }

    /// Returns whether `key` resolves to any value.
    pub fn is_set(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    fn qualify(&self, key: &str) -> String {
        if self.scope.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.scope.join("."), key)
        }
    }

    /// Resolve `key` against this scope, then each enclosing scope.
    fn lookup(&self, key: &str) -> Option<Value> {
        for depth in (0..=self.scope.len()).rev() {
            let full = if depth == 0 {
                key.to_string()
            } else {
                format!("{}.{}", self.scope[..depth].join("."), key)
            };
            if let Some(v) = self.env.get(&env_name(&full)) {
                return Some(Value::String(v.clone()));
            }
            if let Some(v) = get_path(&self.values, &full) {
                return Some(v.clone());
            }
        }
        None
    }
}

/// Environment variable name for a dotted key.
fn env_name(key: &str) -> String {
    key.replace('.', "_").to_uppercase()
}

fn existing_key(table: &Table, segment: &str) -> Option<String> {
    table
        .keys()
        .find(|k| k.eq_ignore_ascii_case(segment))
        .cloned()
}

fn get_path<'a>(table: &'a Table, key: &str) -> Option<&'a Value> {
    let mut segments = key.split('.').filter(|s| !s.is_empty()).peekable();
    let mut current = table;
    while let Some(segment) = segments.next() {
        let (_, value) = current
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(segment))?;
        if segments.peek().is_none() {
            return Some(value);
        }
        current = value.as_table()?;
    }
    None
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_string_from_toml() {
        let config = Config::from_toml_str(
            r#"
            [libstorage]
            host = "tcp://127.0.0.1:7979"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.get_string(HOST).as_deref(),
            Some("tcp://127.0.0.1:7979")
        );
        assert!(config.get_string("libstorage.missing").is_none());
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = Config::from_toml_str("[libstorage\nhost =").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::from_file("/nonexistent/libstorage/config.toml").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_set_builds_nested_tables() {
        let config = Config::new()
            .set(HOST, "unix:///run/ls.sock")
            .set(LOG_REQUESTS, true);
        assert_eq!(config.get_string(HOST).as_deref(), Some("unix:///run/ls.sock"));
        assert!(config.get_bool(LOG_REQUESTS));
        assert!(!config.get_bool(LOG_RESPONSES));
    }

    #[test]
    fn test_set_overwrites_leaf_with_table() {
        let config = Config::new().set("a.b", "leaf").set("a.b.c", "deeper");
        assert_eq!(config.get_string("a.b.c").as_deref(), Some("deeper"));
        assert!(config.get_string("a.b").is_none());
    }

    #[test]
    fn test_scope_falls_back_to_parent() {
        let config = Config::new()
            .set("libstorage.tls.serverName", "parent")
            .set("libstorage.client.tls.certFile", "/etc/cert.pem");
        let scoped = config.scope(CLIENT_SCOPE);
        assert_eq!(scoped.get_string("tls.certFile").as_deref(), Some("/etc/cert.pem"));
        assert_eq!(scoped.get_string("tls.serverName").as_deref(), Some("parent"));
    }

    #[test]
    fn test_scope_prefers_innermost() {
        let config = Config::new()
            .set("tls.serverName", "root")
            .set("libstorage.client.tls.serverName", "client");
        let scoped = config.scope(CLIENT_SCOPE);
        assert_eq!(scoped.get_string("tls.serverName").as_deref(), Some("client"));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let config = Config::new().set("libstorage.client.tls.serverName", "x");
        assert_eq!(
            config.get_string("libstorage.client.tls.servername").as_deref(),
            Some("x")
        );
    }

    #[test]
    fn test_env_overrides_file_values() {
        let config = Config::new()
            .set(HOST, "tcp://file:1")
            .with_env_vars([("LIBSTORAGE_HOST", "tcp://env:2")]);
        assert_eq!(config.get_string(HOST).as_deref(), Some("tcp://env:2"));
    }

    #[test]
    fn test_env_applies_within_scope() {
        let config = Config::new()
            .with_env_vars([("LIBSTORAGE_CLIENT_TLS_INSECURE", "yes")]);
        assert!(config.scope(CLIENT_SCOPE).get_bool("tls.insecure"));
    }

    #[test]
    fn test_get_bool_parsing() {
        let config = Config::new()
            .set("a", "TRUE")
            .set("b", "off")
            .set("c", 1)
            .set("d", "garbage");
        assert!(config.get_bool("a"));
        assert!(!config.get_bool("b"));
        assert!(config.get_bool("c"));
        assert!(!config.get_bool("d"));
        assert!(!config.get_bool("missing"));
    }

    #[test]
    fn test_non_string_values_render() {
        let config = Config::new().set("port", 7979).set("flag", false);
        assert_eq!(config.get_string("port").as_deref(), Some("7979"));
        assert_eq!(config.get_string("flag").as_deref(), Some("false"));
    }

    #[test]
    fn test_set_within_scope_qualifies_key() {
        let scoped = Config::new().scope(CLIENT_SCOPE).set("tls.keyFile", "/k.pem");
        assert_eq!(
            scoped.get_string("tls.keyFile").as_deref(),
            Some("/k.pem")
        );
        assert!(scoped.is_set("tls.keyFile"));
    }
}
