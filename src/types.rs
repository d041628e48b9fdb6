use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::{self, OperationKind};
use crate::context::RequestContext;

/// A user-interface event reported by the browser.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FrontendEvent {
    pub event: String,
    pub element: Option<String>,
    pub page_url: String,
    pub referrer: Option<String>,
    pub occurred_at: DateTime<Utc>, // client clock
}

/// A handled backend request, captured server-side.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BackendCall {
    pub method: String,
    pub endpoint: String,
    pub handler: String, // "module::method"
    pub params: Option<String>,
    pub status: Option<u16>,
    pub client_addr: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// The client's browser, OS, device class and locale.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ClientEnvironment {
    pub browser: Option<String>,
    pub browser_version: Option<String>,
    pub os: Option<String>,
    pub device: Option<String>,
    pub locale: Option<String>,
}

impl BackendCall {
    /// Builds a call entry from the captured request context.
    pub fn from_context(ctx: &RequestContext) -> Self {
        Self {
            method: ctx.method.clone().unwrap_or_default(),
            endpoint: ctx.endpoint.clone().unwrap_or_default(),
            handler: ctx.handler.clone().unwrap_or_default(),
            params: ctx.params.clone(),
            status: ctx.status,
            client_addr: ctx.client_addr.clone(),
            occurred_at: ctx.captured_at.unwrap_or_else(Utc::now),
        }
    }
}

impl ClientEnvironment {
    /// Builds an environment entry from the captured request context.
    pub fn from_context(ctx: &RequestContext) -> Self {
        Self {
            browser: ctx.browser.clone(),
            browser_version: ctx.browser_version.clone(),
            os: ctx.os.clone(),
            device: ctx.device.clone(),
            locale: ctx.locale.clone(),
        }
    }
}

/// The durable form a buffered entry is persisted as.
///
/// The store assigns the surrogate key; the pipeline only ever appends.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LogRecord {
    pub path: String,
    pub kind: String, // one-character operation-kind code
    pub origin: Option<String>,
    pub payload: String, // the JSON-serialized source entry
    pub written_at: DateTime<Utc>,
}

/// One buffered log-source shape, as the flusher sees it.
///
/// The three entry types differ in how their operation kind is derived and
/// in which fields feed the persisted record; this is the seam that lets one
/// flusher sweep all three buffers.
pub trait LogSource: Serialize + Clone + Send + 'static {
    /// The operation kind this entry classifies into.
    fn kind(&self) -> OperationKind;
    /// The URL or endpoint path recorded on the persisted record.
    fn path(&self) -> &str;
    /// The originating address, where the entry carries one.
    fn origin(&self) -> Option<&str> {
        None
    }
}

impl LogSource for FrontendEvent {
    fn kind(&self) -> OperationKind {
        classify::classify_event(&self.event)
    }

    fn path(&self) -> &str {
        &self.page_url
    }
}

impl LogSource for BackendCall {
    fn kind(&self) -> OperationKind {
        classify::classify_verb(&self.method)
    }

    fn path(&self) -> &str {
        &self.endpoint
    }

    fn origin(&self) -> Option<&str> {
        self.client_addr.as_deref()
    }
}

impl LogSource for ClientEnvironment {
    // Environment entries carry neither an event name nor a verb.
    fn kind(&self) -> OperationKind {
        OperationKind::Other
    }

    fn path(&self) -> &str {
        ""
    }
}
