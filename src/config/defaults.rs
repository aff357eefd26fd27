//! Static fallback values for config keys.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::config::schema::Definition;

/// Immutable key → default value table, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct DefaultsTable {
    values: HashMap<String, Value>,
}

impl DefaultsTable {
    /// Build the table from the `[definitions]` section of the config.
    pub fn from_definitions(definitions: &BTreeMap<String, Definition>) -> Self {
        let values: HashMap<_, _> = definitions
            .iter()
            .map(|(key, def)| (key.clone(), def.default.clone()))
            .collect();
        tracing::info!(count = values.len(), "Loaded default config values");
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// All defined keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.values.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for DefaultsTable {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
