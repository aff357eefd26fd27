//! Cross-process cache invalidation over a broadcast channel.
//!
//! # Data Flow
//! ```text
//! config write (changes::ConfigWriter)
//!     → changes::ChangeHook
//!     → publisher.rs (publish key, fire and forget)
//!     → Transport (Redis PUBLISH / in-memory broadcast)
//!     → subscriber.rs in every process (invalidate key in LocalCache)
//!     → next read misses and re-fetches from the store
//! ```
//!
//! # Design Decisions
//! - Messages carry only the key; the store stays the source of truth
//! - Delivery is best effort; a lost message leaves a value stale until the
//!   next invalidation or restart
//! - Publish failures never reach the write path
//! - The writing process drops its own cached key directly, so a failed
//!   publish only delays other processes
//! - A resubscribe clears the local cache to cover messages missed while down

pub mod memory;
pub mod publisher;
pub mod redis;
pub mod subscriber;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use thiserror::Error;

pub use memory::MemoryTransport;
pub use publisher::ChangePublisher;
pub use self::redis::RedisTransport;
pub use subscriber::{InvalidationSubscriber, SubscriberState};

/// Errors from the broadcast transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not reach the broker or the connection failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// The subscription ended without an error.
    #[error("subscription closed")]
    Closed,

    /// Anything else; retried after a longer delay.
    #[error("unexpected transport error: {0}")]
    Unexpected(String),
}

impl TransportError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Connection(_) => "connection",
            TransportError::Closed => "closed",
            TransportError::Unexpected(_) => "unexpected",
        }
    }
}

/// Raw message payloads received on a subscription.
pub type MessageStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

/// A named-channel publish/subscribe transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Publish `message` on `channel`. Returns the number of receivers, if known.
    async fn publish(&self, channel: &str, message: &str) -> Result<usize, TransportError>;

    /// Open a subscription to `channel`.
    async fn subscribe(&self, channel: &str) -> Result<MessageStream, TransportError>;
}
