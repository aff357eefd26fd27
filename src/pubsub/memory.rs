//! Process-local broadcast transport.
//!
//! Backs single-process mode and tests. Supports simulated outages and
//! dropping every live subscription.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::broadcast;

use crate::pubsub::{MessageStream, Transport, TransportError};

const CHANNEL_CAPACITY: usize = 256;

/// In-memory named-channel transport.
#[derive(Debug)]
pub struct MemoryTransport {
    channels: Mutex<HashMap<String, broadcast::Sender<Vec<u8>>>>,
    online: AtomicBool,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
        }
    }

    fn channels(&self) -> MutexGuard<'_, HashMap<String, broadcast::Sender<Vec<u8>>>> {
        self.channels.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Simulate the broker going down (`false`) or coming back (`true`).
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// End every open subscription, as if the broker dropped its connections.
    pub fn disconnect_all(&self) {
        self.channels().clear();
    }

    /// Deliver raw bytes, bypassing UTF-8 checks. Returns the receiver count.
    pub fn publish_raw(&self, channel: &str, payload: Vec<u8>) -> usize {
        match self.channels().get(channel) {
            Some(tx) => tx.send(payload).unwrap_or(0),
            None => 0,
        }
    }

    /// Number of live subscriptions on `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels()
            .get(channel)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    fn check_online(&self) -> Result<(), TransportError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::Connection("memory transport offline".into()))
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn publish(&self, channel: &str, message: &str) -> Result<usize, TransportError> {
        self.check_online()?;
        Ok(self.publish_raw(channel, message.as_bytes().to_vec()))
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream, TransportError> {
        self.check_online()?;
        let rx = self
            .channels()
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe();

        let stream = futures_util::stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(payload) => return Some((Ok(payload), rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "In-memory subscriber lagged, messages dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        Ok(stream.boxed())
    }
}
