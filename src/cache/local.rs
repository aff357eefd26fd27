//! Process-local config value cache.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use crate::observability::metrics;

/// Last known value per config key.
///
/// Entries never expire; they leave only through [`LocalCache::invalidate`]
/// or [`LocalCache::clear`]. Every operation is a single critical section.
///
/// Each invalidation bumps a generation counter. A reader that fetched a value
/// remotely stores it with [`LocalCache::store_if_current`], so a fetch that
/// raced an invalidation can never put the older value back.
#[derive(Debug, Default)]
pub struct LocalCache {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Value>,
    generation: u64,
}

impl LocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Each critical section is one map operation, so a poisoned map is still consistent.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn lookup(&self, key: &str) -> Option<Value> {
        self.lock().entries.get(key).cloned()
    }

    /// Current invalidation generation. Take it before a remote fetch.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Insert or overwrite the value for `key`.
    pub fn store(&self, key: impl Into<String>, value: Value) {
        let size = {
            let mut inner = self.lock();
            inner.entries.insert(key.into(), value);
            inner.entries.len()
        };
        metrics::record_cache_size(size);
    }

    /// Store `value` only if nothing was invalidated since `generation` was read.
    ///
    /// Returns whether the value was cached.
    pub fn store_if_current(&self, key: impl Into<String>, value: Value, generation: u64) -> bool {
        let size = {
            let mut inner = self.lock();
            if inner.generation != generation {
                return false;
            }
            inner.entries.insert(key.into(), value);
            inner.entries.len()
        };
        metrics::record_cache_size(size);
        true
    }

    /// Remove `key`. Returns whether it was cached.
    pub fn invalidate(&self, key: &str) -> bool {
        let (removed, size) = {
            let mut inner = self.lock();
            inner.generation = inner.generation.wrapping_add(1);
            let removed = inner.entries.remove(key).is_some();
            (removed, inner.entries.len())
        };
        metrics::record_cache_size(size);
        removed
    }

    /// Drop every entry. Returns how many were cached.
    pub fn clear(&self) -> usize {
        let dropped = {
            let mut inner = self.lock();
            inner.generation = inner.generation.wrapping_add(1);
            let dropped = inner.entries.len();
            inner.entries.clear();
            dropped
        };
        metrics::record_cache_size(0);
        dropped
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Copy of every cached entry, sorted by key.
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.lock()
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
