//! Redis connection pool.
//!
//! # Responsibilities
//! - Hold a fixed number of multiplexed connections
//! - Spread callers across them round-robin
//! - Connect lazily; a failed connect is retried on the next use
//!
//! # Design Decisions
//! - `ConnectionManager` reconnects on its own once established
//! - Every connect is bounded by the configured timeout

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use redis::aio::ConnectionManager;
use thiserror::Error;
use tokio::sync::OnceCell;
use tokio::time::timeout;

use crate::config::RedisConfig;

/// Errors acquiring a pooled connection.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Fixed-size round-robin pool of Redis connections.
pub struct RedisPool {
    client: redis::Client,
    slots: Vec<OnceCell<ConnectionManager>>,
    next: AtomicUsize,
    timeout: Duration,
}

impl std::fmt::Debug for RedisPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPool")
            .field("size", &self.slots.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RedisPool {
    /// Create a pool from configuration. Does not connect.
    pub fn new(config: &RedisConfig) -> Result<Self, PoolError> {
        let client = redis::Client::open(config.url.as_str())?;
        let slots = (0..config.pool_size.max(1)).map(|_| OnceCell::new()).collect();

        tracing::info!(pool_size = config.pool_size, "Created Redis connection pool");
        Ok(Self {
            client,
            slots,
            next: AtomicUsize::new(0),
            timeout: config.timeout(),
        })
    }

    /// Get the next connection, connecting its slot if needed.
    pub async fn get(&self) -> Result<ConnectionManager, PoolError> {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.slots.len();
        let conn = self.slots[idx]
            .get_or_try_init(|| async {
                let conn = timeout(self.timeout, ConnectionManager::new(self.client.clone()))
                    .await
                    .map_err(|_| PoolError::Timeout(self.timeout))??;
                tracing::debug!(slot = idx, "Opened pooled Redis connection");
                Ok::<_, PoolError>(conn)
            })
            .await?;
        Ok(conn.clone())
    }

    /// The underlying client, for dedicated (non-pooled) connections such as pub/sub.
    pub fn client(&self) -> &redis::Client {
        &self.client
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }
}
