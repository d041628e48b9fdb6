//! Pipeline wiring and the entry points request-handling code calls.
//!
//! The embedding application constructs the pipeline once at startup,
//! wraps each request future in [`RequestContext::scope`], and calls the
//! record methods from its handlers. Buffering is the only work done on the
//! request path; persistence always happens on the flush timers or at
//! shutdown.
use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use crate::buffer::SessionBuffer;
use crate::context::RequestContext;
use crate::error::LogError;
use crate::flusher::LogFlusher;
use crate::handoff;
use crate::scheduler::{self, FlushSchedule};
use crate::storage::LogRecordStore;
use crate::types::{BackendCall, ClientEnvironment, FrontendEvent};

/// The assembled action-log pipeline: three session buffers, the flusher
/// over them, and the flush timers.
pub struct ActionLogPipeline {
    frontend: Arc<SessionBuffer<FrontendEvent>>,
    backend: Arc<SessionBuffer<BackendCall>>,
    environment: Arc<SessionBuffer<ClientEnvironment>>,
    flusher: Arc<LogFlusher>,
    timers: Vec<JoinHandle<()>>,
}

impl ActionLogPipeline {
    /// Wires the buffers and flusher over `store` and registers the flush
    /// timers.
    pub fn start(store: Arc<dyn LogRecordStore>, schedule: FlushSchedule) -> Self {
        let frontend = Arc::new(SessionBuffer::new());
        let backend = Arc::new(SessionBuffer::new());
        let environment = Arc::new(SessionBuffer::new());

        let flusher = Arc::new(LogFlusher::new(
            frontend.clone(),
            backend.clone(),
            environment.clone(),
            store,
        ));
        let timers = scheduler::spawn_flush_timers(flusher.clone(), &schedule);

        Self {
            frontend,
            backend,
            environment,
            flusher,
            timers,
        }
    }

    /// Buffers a batch of frontend events for `session_id`.
    ///
    /// # Errors
    ///
    /// Rejects an empty session id and an empty event list before touching
    /// any buffer.
    pub fn record_frontend_events(
        &self,
        session_id: &str,
        events: Vec<FrontendEvent>,
    ) -> Result<(), LogError> {
        validate_session(session_id)?;
        if events.is_empty() {
            return Err(LogError::EmptyLogList(session_id.to_string()));
        }

        self.frontend.add_all(session_id, events);
        Ok(())
    }

    /// Buffers a backend-call entry for `session_id`, built from the current
    /// diagnostic context on a background task.
    ///
    /// The calling request thread only validates and spawns; it never blocks
    /// on buffering or persistence.
    ///
    /// # Errors
    ///
    /// Rejects an empty session id.
    pub fn record_backend_call(&self, session_id: &str) -> Result<(), LogError> {
        validate_session(session_id)?;

        let buffer = self.backend.clone();
        let session_id = session_id.to_string();
        handoff::spawn_with_context(async move {
            let ctx = RequestContext::current().unwrap_or_default();
            buffer.add(&session_id, BackendCall::from_context(&ctx));
        });

        Ok(())
    }

    /// Buffers a client-environment entry for `session_id`, built from the
    /// current diagnostic context on a background task.
    ///
    /// # Errors
    ///
    /// Rejects an empty session id.
    pub fn record_client_environment(&self, session_id: &str) -> Result<(), LogError> {
        validate_session(session_id)?;

        let buffer = self.environment.clone();
        let session_id = session_id.to_string();
        handoff::spawn_with_context(async move {
            let ctx = RequestContext::current().unwrap_or_default();
            buffer.add(&session_id, ClientEnvironment::from_context(&ctx));
        });

        Ok(())
    }

    /// The flusher, for manually triggered sweeps.
    pub fn flusher(&self) -> &Arc<LogFlusher> {
        &self.flusher
    }

    /// Stops the flush timers and persists everything still buffered.
    ///
    /// # Returns
    ///
    /// The number of records written by the final sweep.
    ///
    /// # Errors
    ///
    /// Returns an error if the final sweep cannot reach the store; the
    /// timers are already stopped at that point.
    pub async fn shutdown(self) -> Result<usize> {
        for timer in &self.timers {
            timer.abort();
        }
        self.flusher.flush_all().await
    }
}

fn validate_session(session_id: &str) -> Result<(), LogError> {
    if session_id.trim().is_empty() {
        return Err(LogError::EmptySessionId);
    }
    Ok(())
}

/// One-shot `tracing` subscriber setup for embedding binaries and tests.
///
/// Honors `RUST_LOG` when set.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,actionlog=debug"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
