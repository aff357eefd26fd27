//! Redis-backed config store.
//!
//! # Layout
//! ```text
//! <key_prefix><KEY>  →  JSON text of the value
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use redis::AsyncCommands;
use serde_json::Value;
use tokio::time::timeout;

use crate::store::pool::{PoolError, RedisPool};
use crate::store::{ConfigStore, StoreError, StoreResult};

/// Config store reading and writing JSON values in Redis.
#[derive(Debug, Clone)]
pub struct RedisStore {
    pool: Arc<RedisPool>,
    key_prefix: String,
}

impl RedisStore {
    pub fn new(pool: Arc<RedisPool>, key_prefix: impl Into<String>) -> Self {
        Self {
            pool,
            key_prefix: key_prefix.into(),
        }
    }

    fn redis_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

impl From<PoolError> for StoreError {
    fn from(e: PoolError) -> Self {
        StoreError::Connectivity(e.to_string())
    }
}

fn classify(key: &str, e: redis::RedisError) -> StoreError {
    if e.kind() == redis::ErrorKind::TypeError {
        // Key holds something other than a string.
        tracing::error!(key = %key, error = %e, "Unexpected Redis type for config key");
        return StoreError::NotFound(key.to_string());
    }
    StoreError::Connectivity(e.to_string())
}

#[async_trait]
impl ConfigStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Value> {
        let mut conn = self.pool.get().await?;
        let redis_key = self.redis_key(key);

        let raw: Option<String> = timeout(self.pool.timeout(), conn.get::<_, Option<String>>(&redis_key))
            .await
            .map_err(|_| StoreError::Connectivity(format!("GET timed out after {:?}", self.pool.timeout())))?
            .map_err(|e| classify(key, e))?;

        let raw = raw.ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        serde_json::from_str(&raw).map_err(|source| StoreError::Decode {
            key: key.to_string(),
            source,
        })
    }

    async fn set(&self, key: &str, value: &Value) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        let redis_key = self.redis_key(key);
        let encoded = value.to_string();

        timeout(self.pool.timeout(), conn.set::<_, _, ()>(&redis_key, encoded))
            .await
            .map_err(|_| StoreError::Connectivity(format!("SET timed out after {:?}", self.pool.timeout())))?
            .map_err(|e| classify(key, e))?;

        tracing::debug!(key = %key, "Wrote config value to Redis");
        Ok(())
    }
}
