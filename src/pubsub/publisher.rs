//! Change publisher.

use std::sync::Arc;

use crate::observability::metrics;
use crate::pubsub::Transport;

/// Announces changed keys on the invalidation channel.
///
/// Never fails: a lost notification only delays other processes until
/// their next invalidation or restart, so it must not abort the write.
#[derive(Clone)]
pub struct ChangePublisher {
    transport: Arc<dyn Transport>,
    channel: Option<String>,
}

impl ChangePublisher {
    pub fn new(transport: Arc<dyn Transport>, channel: Option<String>) -> Self {
        Self { transport, channel }
    }

    /// Publish `key`. Returns the receiver count on success.
    pub async fn publish(&self, key: &str) -> Option<usize> {
        let Some(channel) = self.channel.as_deref() else {
            tracing::error!(key = %key, "No invalidation channel configured, change not published");
            metrics::record_publish("unconfigured");
            return None;
        };

        match self.transport.publish(channel, key).await {
            Ok(receivers) => {
                tracing::info!(key = %key, channel = %channel, receivers, "Published config change");
                metrics::record_publish("ok");
                Some(receivers)
            }
            Err(e) => {
                tracing::error!(
                    key = %key,
                    channel = %channel,
                    op = "publish",
                    kind = e.kind(),
                    error = %e,
                    "Failed to publish config change"
                );
                metrics::record_publish("failed");
                None
            }
        }
    }
}
