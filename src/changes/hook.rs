//! Change notification hook.

use std::sync::Arc;

use serde_json::Value;

use crate::audit::{AuditLog, ChangeLogRecord};
use crate::pubsub::ChangePublisher;

/// Called after every successful config write.
///
/// Records the change and announces the key. Neither step can fail the write.
#[derive(Clone)]
pub struct ChangeHook {
    audit: Arc<dyn AuditLog>,
    publisher: ChangePublisher,
}

impl ChangeHook {
    pub fn new(audit: Arc<dyn AuditLog>, publisher: ChangePublisher) -> Self {
        Self { audit, publisher }
    }

    pub async fn config_updated(&self, key: &str, old_value: Option<Value>, new_value: Value) {
        tracing::info!(
            key = %key,
            old = ?old_value,
            new = %new_value,
            "Config updated"
        );

        let record = ChangeLogRecord::new(key, old_value, new_value);
        match self.audit.append(record).await {
            Ok(()) => tracing::debug!(key = %key, "Logged config change"),
            Err(e) => tracing::error!(key = %key, op = "audit_append", error = %e, "Failed to log config change"),
        }

        self.publisher.publish(key).await;
    }
}
