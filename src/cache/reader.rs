//! Read-through config reader.
//!
//! # Read Path
//! ```text
//! get(key, default)
//!     → LocalCache hit?                 → return cached value
//!     → circuit unavailable?            → fallback (no network I/O)
//!     → ConfigStore::get(key)
//!         Ok(v)                         → record_success, cache unless invalidated meanwhile, return v
//!         Err(Connectivity)             → record_failure, fallback
//!         Err(NotFound | Decode)        → fallback (circuit untouched)
//! fallback
//!     → explicit default if supplied
//!     → DefaultsTable value (may be None)
//! ```
//!
//! # Design Decisions
//! - `get` is total: store errors are logged and never returned
//! - Locks are never held across the remote call
//! - `None` is the only "no explicit default" marker; falsy values are used as given
//! - Keys missing remotely are not cached and are re-fetched on every miss

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::cache::local::LocalCache;
use crate::config::{DefaultsTable, PubSubConfig};
use crate::observability::metrics;
use crate::pubsub::subscriber::{InvalidationSubscriber, StateCell, SubscriberState};
use crate::pubsub::Transport;
use crate::resilience::CircuitState;
use crate::store::{ConfigStore, StoreError};

/// Process-wide configuration cache.
///
/// Constructed once at startup and shared as `Arc<ConfigCache>` with every
/// request handler and the invalidation listener.
pub struct ConfigCache {
    local: Arc<LocalCache>,
    circuit: CircuitState,
    defaults: DefaultsTable,
    store: Arc<dyn ConfigStore>,
    listener: Mutex<Option<JoinHandle<()>>>,
    listener_state: StateCell,
}

/// Snapshot of the cache for the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub cached_keys: usize,
    pub default_keys: usize,
    pub store_available: bool,
    pub ms_since_store_failure: Option<u64>,
    pub retry_interval_ms: u64,
    pub listener_running: bool,
    pub listener_state: SubscriberState,
}

impl ConfigCache {
    pub fn new(store: Arc<dyn ConfigStore>, defaults: DefaultsTable, retry_interval: Duration) -> Self {
        Self {
            local: Arc::new(LocalCache::new()),
            circuit: CircuitState::new(retry_interval),
            defaults,
            store,
            listener: Mutex::new(None),
            listener_state: StateCell::default(),
        }
    }

    /// Read `key`, falling back to `default` and then to the defaults table.
    pub async fn get(&self, key: &str, default: Option<Value>) -> Option<Value> {
        if let Some(value) = self.local.lookup(key) {
            tracing::debug!(key = %key, "Config retrieved from local cache");
            metrics::record_cache_hit();
            return Some(value);
        }

        tracing::debug!(key = %key, "Cache miss for config");
        metrics::record_cache_miss();

        if !self.circuit.is_available(Instant::now()) {
            tracing::debug!(key = %key, "Remote store unavailable, skipping fetch");
            metrics::record_remote_fetch("skipped");
            return self.fallback(key, default);
        }

        let generation = self.local.generation();
        match self.store.get(key).await {
            Ok(value) => {
                self.circuit.record_success();
                if self.local.store_if_current(key, value.clone(), generation) {
                    tracing::debug!(key = %key, "Fetched config from remote store and cached");
                } else {
                    tracing::debug!(key = %key, "Invalidated during fetch, not caching");
                }
                metrics::record_remote_fetch("ok");
                return Some(value);
            }
            Err(e @ StoreError::Connectivity(_)) => {
                self.circuit.record_failure(Instant::now());
                tracing::warn!(key = %key, op = "get", kind = e.kind(), error = %e, "Remote store read failed");
            }
            Err(e) => {
                tracing::error!(key = %key, op = "get", kind = e.kind(), error = %e, "Config not available in remote store");
            }
        }
        metrics::record_remote_fetch("failed");

        self.fallback(key, default)
    }

    fn fallback(&self, key: &str, default: Option<Value>) -> Option<Value> {
        if let Some(value) = default {
            tracing::warn!(key = %key, value = %value, "Returning explicit default");
            metrics::record_fallback("explicit");
            return Some(value);
        }

        let preloaded = self.defaults.get(key).cloned();
        match &preloaded {
            Some(value) => {
                tracing::warn!(key = %key, value = %value, "Returning preloaded default");
                metrics::record_fallback("preloaded");
            }
            None => {
                tracing::warn!(key = %key, "No value and no default for config");
                metrics::record_fallback("none");
            }
        }
        preloaded
    }

    /// Read `key` with an explicit default.
    pub async fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key, Some(default)).await.unwrap_or(Value::Null)
    }

    /// Read `key` and deserialize it. Wrong-shaped values yield `None`.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key, None).await?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Config value has unexpected type");
                None
            }
        }
    }

    /// Current value of every defined key; keys without any value map to `null`.
    pub async fn values(&self) -> BTreeMap<String, Value> {
        let mut values = BTreeMap::new();
        for key in self.defaults.keys() {
            let value = self.get(key, None).await.unwrap_or(Value::Null);
            values.insert(key.to_string(), value);
        }
        values
    }

    /// Drop `key` from this process's cache.
    pub fn invalidate(&self, key: &str) -> bool {
        self.local.invalidate(key)
    }

    pub fn local(&self) -> &Arc<LocalCache> {
        &self.local
    }

    fn listener_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.listener.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start the invalidation listener unless one is already running.
    ///
    /// Returns `true` if this call started it.
    pub fn start_listener(
        &self,
        transport: Arc<dyn Transport>,
        settings: PubSubConfig,
        shutdown: broadcast::Receiver<()>,
    ) -> bool {
        let mut slot = self.listener_slot();
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            tracing::debug!("Invalidation listener already running");
            return false;
        }

        let subscriber = InvalidationSubscriber::new(
            self.local.clone(),
            transport,
            settings,
            self.listener_state.clone(),
        );
        let state = self.listener_state.clone();
        *slot = Some(tokio::spawn(async move {
            if let Err(panic) = AssertUnwindSafe(subscriber.run(shutdown)).catch_unwind().await {
                state.set(SubscriberState::Disconnected);
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_default();
                tracing::error!(
                    reason = %reason,
                    "Invalidation listener crashed; cached config values may be stale until restart"
                );
            }
        }));
        tracing::info!("Invalidation listener started");
        true
    }

    /// True while the listener task is alive.
    pub fn listener_running(&self) -> bool {
        self.listener_slot()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn listener_state(&self) -> SubscriberState {
        self.listener_state.get()
    }

    /// Wait up to `deadline` for the listener to exit after shutdown was signalled.
    pub async fn join_listener(&self, deadline: Duration) {
        let task = self.listener_slot().take();
        if let Some(task) = task {
            if tokio::time::timeout(deadline, task).await.is_err() {
                tracing::warn!("Invalidation listener did not stop in time");
            }
        }
    }

    pub fn status(&self) -> CacheStatus {
        let circuit = self.circuit.snapshot(Instant::now());
        CacheStatus {
            cached_keys: self.local.len(),
            default_keys: self.defaults.len(),
            store_available: circuit.available,
            ms_since_store_failure: circuit.since_last_failure.map(|d| d.as_millis() as u64),
            retry_interval_ms: circuit.retry_interval.as_millis() as u64,
            listener_running: self.listener_running(),
            listener_state: self.listener_state(),
        }
    }
}
