//! Remote configuration store clients.
//!
//! # Data Flow
//! ```text
//! ConfigCache (miss)
//!     → ConfigStore::get(key)
//!         → redis.rs: pool.rs connection → GET <prefix><key> → JSON decode
//!         → memory.rs: process-local map
//! ```
//!
//! # Design Decisions
//! - Connectivity failures are distinguished from "key not present"
//! - Values are opaque JSON; the store never interprets them
//! - The trait is object safe so the cache holds `Arc<dyn ConfigStore>`

pub mod memory;
pub mod pool;
pub mod redis;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use memory::MemoryStore;
pub use pool::RedisPool;
pub use self::redis::RedisStore;

/// Errors returned by a remote config store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store unreachable, timed out, or failed at the protocol level.
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// Key has no value in the store.
    #[error("key '{0}' not found")]
    NotFound(String),

    /// Stored bytes are not a valid JSON value.
    #[error("undecodable value for '{key}': {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Connectivity(_) => "connectivity",
            StoreError::NotFound(_) => "not_found",
            StoreError::Decode { .. } => "decode",
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A remote key-value store holding configuration values.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Value>;

    async fn set(&self, key: &str, value: &Value) -> StoreResult<()>;
}
