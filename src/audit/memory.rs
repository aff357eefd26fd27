//! In-memory change log.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::audit::{AuditError, AuditLog, ChangeLogRecord};

#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    records: Mutex<Vec<ChangeLogRecord>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn append(&self, record: ChangeLogRecord) -> Result<(), AuditError> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ChangeLogRecord>, AuditError> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.iter().rev().take(limit).cloned().collect())
    }
}
