//! This module defines the storage interface and implementations for the
//! durable log records the flusher writes.
pub mod memory;
pub mod records;

pub use memory::MemoryRecordStore;
pub use records::{LogRecordStore, SledRecordStore};
