//! This module defines the storage interface and the sled-backed
//! implementation for persisted log records.
use anyhow::Result;
use async_trait::async_trait;
use sled::Db;
use tracing::warn;

use crate::types::LogRecord;

/// A trait for appending persisted log records.
///
/// The pipeline is append-only: records are written in batches during a
/// flush sweep and never updated or deleted. The store assigns each record
/// a surrogate identifier.
#[async_trait]
pub trait LogRecordStore: Send + Sync {
    /// Appends a batch of records.
    ///
    /// A failure to persist one record must not prevent the rest of the
    /// batch from being attempted; implementations log the failure with
    /// enough context to reconstruct the record and move on.
    ///
    /// # Returns
    ///
    /// The number of records actually written.
    ///
    /// # Errors
    ///
    /// Returns an error only when the store as a whole is unusable, not for
    /// per-record failures.
    async fn append_batch(&self, records: Vec<LogRecord>) -> Result<usize>;

    /// Reads back every stored record, oldest first.
    ///
    /// Diagnostic surface; the pipeline itself never reads records back.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    async fn scan(&self) -> Result<Vec<LogRecord>>;
}

/// A `LogRecordStore` implementation using `sled` for storage.
pub struct SledRecordStore {
    db: Db,
    tree: sled::Tree,
}

impl SledRecordStore {
    /// Creates a new `SledRecordStore`.
    ///
    /// # Arguments
    ///
    /// * `db` - The `sled::Db` instance to use for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying `sled` tree cannot be opened.
    pub fn new(db: Db) -> Result<Self> {
        let tree = db.open_tree("action_log")?;
        Ok(Self { db, tree })
    }
}

#[async_trait]
impl LogRecordStore for SledRecordStore {
    async fn append_batch(&self, records: Vec<LogRecord>) -> Result<usize> {
        let mut written = 0;

        for record in records {
            // The monotonic id doubles as the surrogate key, keeping
            // records iterable in write order.
            let id = self.db.generate_id()?;

            let value = match serde_json::to_vec(&record) {
                Ok(value) => value,
                Err(e) => {
                    warn!(
                        path = %record.path,
                        kind = %record.kind,
                        error = %e,
                        "failed to encode log record, skipping"
                    );
                    continue;
                }
            };

            match self.tree.insert(id.to_be_bytes(), value) {
                Ok(_) => written += 1,
                Err(e) => {
                    warn!(
                        path = %record.path,
                        kind = %record.kind,
                        payload = %record.payload,
                        error = %e,
                        "failed to persist log record, skipping"
                    );
                }
            }
        }

        self.tree.flush_async().await?;
        Ok(written)
    }

    async fn scan(&self) -> Result<Vec<LogRecord>> {
        let mut records = Vec::new();

        for result in self.tree.iter() {
            let (_key, value) = result?;
            records.push(serde_json::from_slice(&value)?);
        }

        Ok(records)
    }
}
