//! In-memory record store, for tests and embedding test suites.
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use crate::storage::LogRecordStore;
use crate::types::LogRecord;

/// A `LogRecordStore` that keeps records in a `Vec`.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LogRecordStore for MemoryRecordStore {
    async fn append_batch(&self, records: Vec<LogRecord>) -> Result<usize> {
        let written = records.len();
        self.records.lock().unwrap().extend(records);
        Ok(written)
    }

    async fn scan(&self) -> Result<Vec<LogRecord>> {
        Ok(self.records.lock().unwrap().clone())
    }
}
