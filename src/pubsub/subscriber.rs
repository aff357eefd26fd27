//! Invalidation subscriber.
//!
//! # States
//! ```text
//! Disconnected → Connecting: loop (re)starts
//! Connecting → Listening: subscription open
//! Listening → Listening: message handled (valid or malformed)
//! Connecting | Listening → Disconnected: transport error, then backoff
//! any → (stopped): shutdown signal
//! ```
//!
//! # Design Decisions
//! - Runs on its own task, never on a request path
//! - Never gives up: every transport error leads to a reconnect
//! - Connection errors retry quickly; unexpected errors wait longer
//! - Every resubscribe clears the local cache; messages sent while
//!   disconnected are never delivered

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::cache::LocalCache;
use crate::config::PubSubConfig;
use crate::observability::metrics;
use crate::pubsub::{Transport, TransportError};
use crate::resilience::backoff::with_jitter;

/// Listener connection state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriberState {
    Disconnected = 0,
    Connecting = 1,
    Listening = 2,
}

impl From<u8> for SubscriberState {
    fn from(val: u8) -> Self {
        match val {
            1 => SubscriberState::Connecting,
            2 => SubscriberState::Listening,
            _ => SubscriberState::Disconnected,
        }
    }
}

/// Shared, lock-free holder of the current [`SubscriberState`].
#[derive(Debug, Clone, Default)]
pub struct StateCell(Arc<AtomicU8>);

impl StateCell {
    pub fn get(&self) -> SubscriberState {
        SubscriberState::from(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: SubscriberState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// A payload that does not name a config key.
#[derive(Debug, PartialEq, Eq)]
enum Malformed {
    Empty,
    NotUtf8,
}

fn parse_key(payload: &[u8]) -> Result<&str, Malformed> {
    let text = std::str::from_utf8(payload).map_err(|_| Malformed::NotUtf8)?;
    let key = text.trim();
    if key.is_empty() {
        return Err(Malformed::Empty);
    }
    Ok(key)
}

/// Background listener dropping changed keys from the local cache.
pub struct InvalidationSubscriber {
    cache: Arc<LocalCache>,
    transport: Arc<dyn Transport>,
    settings: PubSubConfig,
    state: StateCell,
}

impl InvalidationSubscriber {
    pub fn new(
        cache: Arc<LocalCache>,
        transport: Arc<dyn Transport>,
        settings: PubSubConfig,
        state: StateCell,
    ) -> Self {
        Self {
            cache,
            transport,
            settings,
            state,
        }
    }

    /// Run until `shutdown` fires.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let Some(channel) = self.settings.channel_name().map(str::to_string) else {
            tracing::warn!("No invalidation channel configured; cached config values will not be invalidated");
            return;
        };

        tracing::info!(channel = %channel, "Invalidation listener starting");

        let mut resync = false;
        loop {
            self.state.set(SubscriberState::Connecting);

            let error = tokio::select! {
                error = self.listen(&channel, resync) => error,
                _ = shutdown.recv() => break,
            };
            resync = true;

            self.state.set(SubscriberState::Disconnected);
            let delay = match error {
                TransportError::Connection(_) | TransportError::Closed => self.settings.reconnect_delay(),
                TransportError::Unexpected(_) => self.settings.error_delay(),
            };
            let delay = with_jitter(delay);
            tracing::warn!(
                channel = %channel,
                kind = error.kind(),
                error = %error,
                retry_in_ms = delay.as_millis() as u64,
                "Invalidation listener disconnected"
            );
            metrics::record_subscriber_reconnect(error.kind());

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.recv() => break,
            }
        }

        self.state.set(SubscriberState::Disconnected);
        tracing::info!(channel = %channel, "Invalidation listener stopped");
    }

    /// Subscribe and handle messages until the subscription fails.
    ///
    /// With `resync` set, the local cache is cleared once subscribed, since
    /// invalidations published while disconnected were lost.
    async fn listen(&self, channel: &str, resync: bool) -> TransportError {
        let mut messages = match self.transport.subscribe(channel).await {
            Ok(messages) => messages,
            Err(e) => return e,
        };

        if resync {
            let dropped = self.cache.clear();
            tracing::info!(channel = %channel, dropped, "Resubscribed, cleared local cache");
        }

        self.state.set(SubscriberState::Listening);
        tracing::info!(channel = %channel, "Listening for config invalidations");

        while let Some(message) = messages.next().await {
            match message {
                Ok(payload) => self.handle_payload(&payload),
                Err(e) => return e,
            }
        }
        TransportError::Closed
    }

    fn handle_payload(&self, payload: &[u8]) {
        match parse_key(payload) {
            Ok(key) => {
                let removed = self.cache.invalidate(key);
                tracing::info!(key = %key, removed, "Config invalidated");
                metrics::record_invalidation(removed);
            }
            Err(reason) => {
                tracing::warn!(reason = ?reason, len = payload.len(), "Ignoring malformed invalidation message");
                metrics::record_malformed_message();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key(b"SITE_NAME"), Ok("SITE_NAME"));
        assert_eq!(parse_key(b" SITE_NAME\n"), Ok("SITE_NAME"));
        assert_eq!(parse_key(b""), Err(Malformed::Empty));
        assert_eq!(parse_key(b"   "), Err(Malformed::Empty));
        assert_eq!(parse_key(&[0xff, 0xfe]), Err(Malformed::NotUtf8));
    }

    #[test]
    fn test_state_cell() {
        let cell = StateCell::default();
        assert_eq!(cell.get(), SubscriberState::Disconnected);
        cell.set(SubscriberState::Listening);
        assert_eq!(cell.clone().get(), SubscriberState::Listening);
        assert_eq!(SubscriberState::from(9), SubscriberState::Disconnected);
    }
}
