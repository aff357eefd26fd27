//! Shared doubles and helpers for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use realtime_config::audit::{AuditError, AuditLog, ChangeLogRecord};
use realtime_config::config::{DefaultsTable, PubSubConfig};
use realtime_config::pubsub::{MessageStream, Transport, TransportError};
use realtime_config::store::{ConfigStore, MemoryStore, StoreError, StoreResult};

pub const CHANNEL: &str = "config_updates";

/// Store wrapper that counts remote reads.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    gets: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigStore for CountingStore {
    async fn get(&self, key: &str) -> StoreResult<Value> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &Value) -> StoreResult<()> {
        self.inner.set(key, value).await
    }
}

/// Store whose first read parks after loading the value until released.
#[derive(Default)]
pub struct GatedStore {
    pub inner: MemoryStore,
    pub entered: Notify,
    pub release: Notify,
    gated: AtomicBool,
}

impl GatedStore {
    pub fn new() -> Arc<Self> {
        let store = Self::default();
        store.gated.store(true, Ordering::SeqCst);
        Arc::new(store)
    }
}

#[async_trait]
impl ConfigStore for GatedStore {
    async fn get(&self, key: &str) -> StoreResult<Value> {
        let value = self.inner.get(key).await;
        if self.gated.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        value
    }

    async fn set(&self, key: &str, value: &Value) -> StoreResult<()> {
        self.inner.set(key, value).await
    }
}

/// Store holding a value that never decodes.
#[derive(Default)]
pub struct UndecodableStore {
    gets: AtomicUsize,
}

impl UndecodableStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigStore for UndecodableStore {
    async fn get(&self, key: &str) -> StoreResult<Value> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Decode {
            key: key.to_string(),
            source: serde_json::from_str::<Value>("{not json").unwrap_err(),
        })
    }

    async fn set(&self, _key: &str, _value: &Value) -> StoreResult<()> {
        Ok(())
    }
}

/// Transport whose every call fails.
pub struct FailingTransport;

#[async_trait]
impl Transport for FailingTransport {
    async fn publish(&self, _channel: &str, _message: &str) -> Result<usize, TransportError> {
        Err(TransportError::Connection("broker unreachable".into()))
    }

    async fn subscribe(&self, _channel: &str) -> Result<MessageStream, TransportError> {
        Err(TransportError::Connection("broker unreachable".into()))
    }
}

/// Audit log that rejects every append.
pub struct FailingAuditLog;

#[async_trait]
impl AuditLog for FailingAuditLog {
    async fn append(&self, _record: ChangeLogRecord) -> Result<(), AuditError> {
        Err(AuditError::Unavailable("audit store down".into()))
    }

    async fn recent(&self, _limit: usize) -> Result<Vec<ChangeLogRecord>, AuditError> {
        Err(AuditError::Unavailable("audit store down".into()))
    }
}

pub fn defaults() -> DefaultsTable {
    [
        ("SITE_NAME", json!("Config Manager")),
        ("MAINTENANCE_MODE", json!(false)),
        ("ITEMS_PER_PAGE", json!(10)),
    ]
    .into_iter()
    .collect()
}

pub fn pubsub_config(reconnect_delay_ms: u64) -> PubSubConfig {
    PubSubConfig {
        channel: Some(CHANNEL.to_string()),
        reconnect_delay_ms,
        error_delay_ms: reconnect_delay_ms,
    }
}

/// Poll `condition` until it holds or `timeout` passes.
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
