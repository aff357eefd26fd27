//! Append-only change log.
//!
//! # Responsibilities
//! - Record every observed config change (key, old value, new value, time)
//! - Return the most recent changes for the admin API
//!
//! # Design Decisions
//! - Records are never mutated or deleted
//! - Append failures are logged by the caller and never abort a write

pub mod file;
pub mod memory;

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use file::FileAuditLog;
pub use memory::MemoryAuditLog;

/// One observed config change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogRecord {
    pub key: String,
    /// Previous value; `None` if the key had no stored value.
    pub old_value: Option<Value>,
    pub new_value: Value,
    /// Seconds since the Unix epoch.
    pub changed_at: u64,
}

impl ChangeLogRecord {
    /// Create a record stamped with the current time.
    pub fn new(key: impl Into<String>, old_value: Option<Value>, new_value: Value) -> Self {
        let changed_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self {
            key: key.into(),
            old_value,
            new_value,
            changed_at,
        }
    }
}

/// Errors from audit log storage.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("audit record encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("audit log unavailable: {0}")]
    Unavailable(String),
}

/// Durable record of config changes.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, record: ChangeLogRecord) -> Result<(), AuditError>;

    /// Up to `limit` records, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<ChangeLogRecord>, AuditError>;
}
