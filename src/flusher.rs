//! This module drains the session buffers into durable storage.
//!
//! A sweep runs in two steps: a short per-bucket critical section that
//! drains the matching entries, then the persistence I/O with no buffer
//! lock held, so a slow store never stalls concurrent `add` calls. Entries
//! that fail to persist after a successful drain are lost by design — the
//! pipeline does not re-insert them, trading exactly-once durability for a
//! bounded buffer under a persistently failing store.
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, error};

use crate::buffer::SessionBuffer;
use crate::classify::OperationKind;
use crate::error::LogError;
use crate::storage::LogRecordStore;
use crate::types::{BackendCall, ClientEnvironment, FrontendEvent, LogRecord, LogSource};

/// Drains buffered entries and persists them as log records.
pub struct LogFlusher {
    frontend: Arc<SessionBuffer<FrontendEvent>>,
    backend: Arc<SessionBuffer<BackendCall>>,
    environment: Arc<SessionBuffer<ClientEnvironment>>,
    store: Arc<dyn LogRecordStore>,
}

impl LogFlusher {
    /// Creates a flusher over the three session buffers and the record store.
    pub fn new(
        frontend: Arc<SessionBuffer<FrontendEvent>>,
        backend: Arc<SessionBuffer<BackendCall>>,
        environment: Arc<SessionBuffer<ClientEnvironment>>,
        store: Arc<dyn LogRecordStore>,
    ) -> Self {
        Self {
            frontend,
            backend,
            environment,
            store,
        }
    }

    /// Persists, per session, the buffered entries of one operation kind —
    /// but only from sessions holding at least `min_count` such entries.
    ///
    /// Sessions below the threshold are left untouched; their entries
    /// accumulate toward the next sweep.
    ///
    /// # Returns
    ///
    /// The number of records written.
    ///
    /// # Errors
    ///
    /// Returns an error if the store as a whole is unusable. Per-record
    /// failures are logged and skipped.
    pub async fn flush_by_kind(&self, kind: OperationKind, min_count: usize) -> Result<usize> {
        let mut records = Vec::new();

        collect(
            self.frontend.drain_matching(min_count, |e| e.kind() == kind),
            &mut records,
        );
        collect(
            self.backend.drain_matching(min_count, |e| e.kind() == kind),
            &mut records,
        );
        collect(
            self.environment.drain_matching(min_count, |e| e.kind() == kind),
            &mut records,
        );

        self.persist(records).await
    }

    /// Unconditionally persists every buffered entry across every session
    /// and every buffer, leaving all buffers empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the store as a whole is unusable. Per-record
    /// failures are logged and skipped.
    pub async fn flush_all(&self) -> Result<usize> {
        let mut records = Vec::new();

        collect(self.frontend.drain_all(), &mut records);
        collect(self.backend.drain_all(), &mut records);
        collect(self.environment.drain_all(), &mut records);

        self.persist(records).await
    }

    async fn persist(&self, records: Vec<LogRecord>) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let written = self.store.append_batch(records).await?;
        debug!(records = written, "flushed log records");
        Ok(written)
    }
}

/// Maps drained entries to persistable records, dropping (and logging) any
/// entry whose payload cannot be serialized.
fn collect<E: LogSource>(drained: HashMap<String, Vec<E>>, out: &mut Vec<LogRecord>) {
    for (session_id, entries) in drained {
        for entry in entries {
            match to_record(&entry) {
                Ok(record) => out.push(record),
                Err(e) => {
                    error!(session = %session_id, error = %e, "dropping unserializable log entry");
                }
            }
        }
    }
}

/// Builds the persisted form of one entry. The operation kind is resolved
/// here, at flush time, and the write timestamp is assigned now rather than
/// at capture.
fn to_record<E: LogSource>(entry: &E) -> Result<LogRecord, LogError> {
    let payload = serde_json::to_string(entry).map_err(|e| LogError::Serialization {
        context: format!("entry at {:?}", entry.path()),
        source: e,
    })?;

    Ok(LogRecord {
        path: entry.path().to_string(),
        kind: entry.kind().code().to_string(),
        origin: entry.origin().map(str::to_string),
        payload,
        written_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryRecordStore;

    fn frontend_event(name: &str) -> FrontendEvent {
        FrontendEvent {
            event: name.to_string(),
            element: None,
            page_url: "/stories".to_string(),
            referrer: None,
            occurred_at: Utc::now(),
        }
    }

    fn backend_call(method: &str, endpoint: &str) -> BackendCall {
        BackendCall {
            method: method.to_string(),
            endpoint: endpoint.to_string(),
            handler: "story::create".to_string(),
            params: None,
            status: Some(201),
            client_addr: Some("10.0.0.7".to_string()),
            occurred_at: Utc::now(),
        }
    }

    struct Fixture {
        frontend: Arc<SessionBuffer<FrontendEvent>>,
        backend: Arc<SessionBuffer<BackendCall>>,
        environment: Arc<SessionBuffer<ClientEnvironment>>,
        store: Arc<MemoryRecordStore>,
        flusher: LogFlusher,
    }

    fn fixture() -> Fixture {
        let frontend = Arc::new(SessionBuffer::new());
        let backend = Arc::new(SessionBuffer::new());
        let environment = Arc::new(SessionBuffer::new());
        let store = Arc::new(MemoryRecordStore::new());
        let flusher = LogFlusher::new(
            frontend.clone(),
            backend.clone(),
            environment.clone(),
            store.clone(),
        );
        Fixture {
            frontend,
            backend,
            environment,
            store,
            flusher,
        }
    }

    #[tokio::test]
    async fn kind_sweep_drains_only_sessions_above_the_threshold() {
        // given: session A holds Read events below the threshold, session B
        // holds Create events above it
        let f = fixture();
        f.frontend.add_all("sess-a", vec![frontend_event("click"), frontend_event("view")]);
        f.frontend.add_all(
            "sess-b",
            vec![
                frontend_event("create"),
                frontend_event("create"),
                frontend_event("create"),
            ],
        );

        // when
        let written = f.flusher.flush_by_kind(OperationKind::Create, 3).await.unwrap();

        // then: only B's qualifying entries were persisted
        assert_eq!(written, 3);
        assert_eq!(f.frontend.count("sess-a"), 2);
        assert_eq!(f.frontend.count("sess-b"), 0);

        let records = f.store.scan().await.unwrap();
        assert!(records.iter().all(|r| r.kind == "C"));
    }

    #[tokio::test]
    async fn below_threshold_sweep_writes_nothing() {
        let f = fixture();
        f.frontend.add("sess-a", frontend_event("create"));

        let written = f.flusher.flush_by_kind(OperationKind::Create, 10).await.unwrap();

        assert_eq!(written, 0);
        assert_eq!(f.frontend.count("sess-a"), 1);
        assert!(f.store.scan().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn backend_kind_is_resolved_from_the_verb_at_flush_time() {
        let f = fixture();
        f.backend.add("sess-1", backend_call("POST", "/donation/story"));

        f.flusher.flush_by_kind(OperationKind::Create, 1).await.unwrap();

        let records = f.store.scan().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, "C");
        assert_eq!(records[0].path, "/donation/story");
        assert_eq!(records[0].origin.as_deref(), Some("10.0.0.7"));
        assert!(records[0].payload.contains("story::create"));
    }

    #[tokio::test]
    async fn environment_entries_ride_the_other_sweep() {
        let f = fixture();
        f.environment.add(
            "sess-1",
            ClientEnvironment {
                browser: Some("Firefox".into()),
                browser_version: None,
                os: Some("Linux".into()),
                device: Some("desktop".into()),
                locale: Some("ko-KR".into()),
            },
        );

        let written = f.flusher.flush_by_kind(OperationKind::Other, 1).await.unwrap();

        assert_eq!(written, 1);
        assert_eq!(f.store.scan().await.unwrap()[0].kind, "O");
    }

    #[tokio::test]
    async fn flush_all_empties_every_buffer_regardless_of_kind_or_count() {
        let f = fixture();
        f.frontend.add("sess-a", frontend_event("click"));
        f.frontend.add("sess-b", frontend_event("create"));
        f.backend.add("sess-a", backend_call("GET", "/articles"));
        f.environment.add(
            "sess-c",
            ClientEnvironment {
                browser: None,
                browser_version: None,
                os: None,
                device: None,
                locale: None,
            },
        );

        let written = f.flusher.flush_all().await.unwrap();

        assert_eq!(written, 4);
        assert_eq!(f.frontend.count("sess-a"), 0);
        assert_eq!(f.frontend.count("sess-b"), 0);
        assert_eq!(f.backend.count("sess-a"), 0);
        assert_eq!(f.environment.count("sess-c"), 0);

        // A second full flush finds nothing.
        assert_eq!(f.flusher.flush_all().await.unwrap(), 0);
    }
}
