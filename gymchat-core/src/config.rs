//! # GymChat Configuration
//!
//! A minimal string key/value store with dotted keys. Values are set
//! while the process starts (`ConfigStore`) and then frozen into a
//! `ConfigSnapshot` that is handed to every component. Nothing reads
//! configuration from global state after startup.
//!
//! ## Setting and reading values
//! ```rust
//! use gymchat_core::ConfigStore;
//! let mut store = ConfigStore::new();
//!
//! store.set("auth.ttl", "1h");
//! let snapshot = store.snapshot();
//!
//! assert_eq!(snapshot.get("auth.ttl"), Some("1h"));
//! ```
//!
//! ## Environment overrides
//! `ConfigStore::load_env` maps prefixed variables onto dotted keys:
//!
//! ```bash
//! export GYMCHAT__WEBHOOK__SECRET=s3cret   # -> webhook.secret
//! ```

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct ConfigStore {
    values: HashMap<String, String>,
}

impl ConfigStore {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Set a key only if it is not present yet.
    pub fn set_default<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.entry(key.into()).or_insert_with(|| value.into());
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// Load every variable starting with `prefix`, e.g. with prefix
    /// `GYMCHAT__`, `GYMCHAT__AUTH__TTL` becomes `auth.ttl`.
    pub fn load_env(&mut self, prefix: &str) {
        self.load_vars(prefix, std::env::vars());
    }

    /// Same as [`ConfigStore::load_env`] over an explicit variable list.
    pub fn load_vars<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                if stripped.is_empty() {
                    continue;
                }
                let normalized = stripped.to_lowercase().replace("__", ".");
                self.set(normalized, value);
            }
        }
    }

    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigSnapshot {
    map: HashMap<String, String>,
}

impl ConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    /// Like `get`, but owned, and whitespace-only values count as absent.
    pub fn get_non_empty(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }
}
