//! # Configuration
//!
//! A minimal string key/value store. The server loads environment variables
//! into it under dotted keys (`media.secret`, `feed.history_length`, ...) and
//! reads them back through a [`ConfigSnapshot`]; parsing into typed values is
//! left to the caller.
//!
//! ```rust
//! use beat_core::BeatConfig;
//!
//! let mut config = BeatConfig::new();
//! config.set("feed.history_length", "50");
//!
//! let snapshot = config.snapshot();
//! assert_eq!(snapshot.get("feed.history_length"), Some("50"));
//! ```
//!
//! Higher-level loaders (TOML, Vault, ...) stay out of the core.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct BeatConfig {
    values: HashMap<String, String>,
}

impl BeatConfig {
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

    /// Set a key only when it is not present yet.
    pub fn set_default<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.entry(key.into()).or_insert_with(|| value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot::new(self.values.clone())
    }
}

/// Immutable, cloneable view over a [`BeatConfig`].
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

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).map(str::to_string)
    }
}
