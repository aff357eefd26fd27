//! Redis pub/sub transport.
//!
//! Publishing goes through the shared connection pool; each subscription
//! opens its own dedicated connection, closed when the stream is dropped.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::AsyncCommands;
use tokio::time::timeout;

use crate::pubsub::{MessageStream, Transport, TransportError};
use crate::store::pool::{PoolError, RedisPool};

/// Broadcast transport over Redis PUBLISH / SUBSCRIBE.
#[derive(Debug, Clone)]
pub struct RedisTransport {
    pool: Arc<RedisPool>,
}

impl RedisTransport {
    pub fn new(pool: Arc<RedisPool>) -> Self {
        Self { pool }
    }
}

impl From<PoolError> for TransportError {
    fn from(e: PoolError) -> Self {
        TransportError::Connection(e.to_string())
    }
}

fn classify(e: redis::RedisError) -> TransportError {
    if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout() {
        TransportError::Connection(e.to_string())
    } else {
        TransportError::Unexpected(e.to_string())
    }
}

#[async_trait]
impl Transport for RedisTransport {
    async fn publish(&self, channel: &str, message: &str) -> Result<usize, TransportError> {
        let mut conn = self.pool.get().await?;
        let receivers: i64 = timeout(self.pool.timeout(), conn.publish::<_, _, i64>(channel, message))
            .await
            .map_err(|_| TransportError::Connection("PUBLISH timed out".into()))?
            .map_err(classify)?;
        Ok(receivers.max(0) as usize)
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream, TransportError> {
        let mut pubsub = timeout(self.pool.timeout(), self.pool.client().get_async_pubsub())
            .await
            .map_err(|_| TransportError::Connection("pub/sub connect timed out".into()))?
            .map_err(classify)?;

        timeout(self.pool.timeout(), pubsub.subscribe(channel))
            .await
            .map_err(|_| TransportError::Connection("SUBSCRIBE timed out".into()))?
            .map_err(classify)?;

        let messages = pubsub
            .into_on_message()
            .map(|msg| Ok(msg.get_payload_bytes().to_vec()));
        Ok(messages.boxed())
    }
}
