//! Config write path.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::cache::LocalCache;
use crate::changes::hook::ChangeHook;
use crate::store::{ConfigStore, StoreError, StoreResult};

/// Result of a write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteOutcome {
    pub key: String,
    pub old_value: Option<Value>,
    pub new_value: Value,
    pub changed: bool,
}

/// Writes config values to the remote store and fires the change hook.
///
/// When built [`with_local_cache`](Self::with_local_cache), the written key is
/// dropped from this process's cache directly, so the writer sees its own
/// write even if the broadcast is lost.
#[derive(Clone)]
pub struct ConfigWriter {
    store: Arc<dyn ConfigStore>,
    hook: ChangeHook,
    local: Option<Arc<LocalCache>>,
}

impl ConfigWriter {
    pub fn new(store: Arc<dyn ConfigStore>, hook: ChangeHook) -> Self {
        Self {
            store,
            hook,
            local: None,
        }
    }

    pub fn with_local_cache(mut self, local: Arc<LocalCache>) -> Self {
        self.local = Some(local);
        self
    }

    /// Store `value` under `key`; the hook runs only if the value changed.
    pub async fn set(&self, key: &str, value: Value) -> StoreResult<WriteOutcome> {
        let old_value = match self.store.get(key).await {
            Ok(v) => Some(v),
            Err(StoreError::NotFound(_)) => None,
            Err(StoreError::Decode { .. }) => {
                tracing::warn!(key = %key, "Overwriting undecodable config value");
                None
            }
            Err(e) => return Err(e),
        };

        self.store.set(key, &value).await?;
        if let Some(local) = &self.local {
            local.invalidate(key);
        }

        let changed = old_value.as_ref() != Some(&value);
        if changed {
            self.hook
                .config_updated(key, old_value.clone(), value.clone())
                .await;
        } else {
            tracing::debug!(key = %key, "Config value unchanged");
        }

        Ok(WriteOutcome {
            key: key.to_string(),
            old_value,
            new_value: value,
            changed,
        })
    }
}
