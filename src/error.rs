//! Caller-visible error types for the log pipeline.
use thiserror::Error;

/// Errors surfaced at the pipeline's ingestion and persistence boundaries.
#[derive(Debug, Error)]
pub enum LogError {
    /// A record call was made with an empty session identifier.
    #[error("empty session id")]
    EmptySessionId,

    /// A frontend submission arrived with no events in it.
    #[error("empty log list for session {0}")]
    EmptyLogList(String),

    /// A buffered entry could not be serialized into a persistable payload.
    #[error("failed to serialize log payload ({context})")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
