//! Per-request diagnostic context.
//!
//! The embedding application captures these fields once per request and
//! installs them for the duration of the request future via [`RequestContext::scope`].
//! Log-construction code running inside that scope (or inside a task spawned
//! through [`crate::handoff::spawn_with_context`]) reads them back with
//! [`RequestContext::current`]. The slot is task-local: it is dropped with
//! the scope, never shared between unrelated tasks.
use chrono::{DateTime, Utc};

tokio::task_local! {
    static CURRENT: RequestContext;
}

/// Diagnostic fields describing the request currently being handled.
///
/// Every field is optional; a context captured outside an HTTP request (for
/// example in a background job) simply leaves the transport fields unset.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    /// Remote address of the caller.
    pub client_addr: Option<String>,
    /// Transport verb of the request.
    pub method: Option<String>,
    /// Endpoint path the request hit.
    pub endpoint: Option<String>,
    /// Handler identity, as `module::method`.
    pub handler: Option<String>,
    /// Serialized request parameters.
    pub params: Option<String>,
    /// Response status code, set once the handler has run.
    pub status: Option<u16>,
    /// Server-side capture timestamp.
    pub captured_at: Option<DateTime<Utc>>,
    pub browser: Option<String>,
    pub browser_version: Option<String>,
    pub os: Option<String>,
    pub device: Option<String>,
    pub locale: Option<String>,
}

impl RequestContext {
    /// Runs `task` with this context installed as the ambient context.
    ///
    /// The context lives exactly as long as `task`: when the future
    /// completes, is cancelled, or panics, the slot is dropped with it.
    pub async fn scope<F>(self, task: F) -> F::Output
    where
        F: std::future::Future,
    {
        CURRENT.scope(self, task).await
    }

    /// Returns a copy of the ambient context, if the current task has one.
    pub fn current() -> Option<RequestContext> {
        CURRENT.try_with(Clone::clone).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scope_makes_context_visible_to_the_wrapped_future() {
        let ctx = RequestContext {
            method: Some("POST".into()),
            endpoint: Some("/donation/story".into()),
            ..Default::default()
        };

        let seen = ctx
            .scope(async { RequestContext::current().expect("context should be installed") })
            .await;

        assert_eq!(seen.method.as_deref(), Some("POST"));
        assert_eq!(seen.endpoint.as_deref(), Some("/donation/story"));
    }

    #[tokio::test]
    async fn current_is_none_outside_any_scope() {
        assert!(RequestContext::current().is_none());
    }

    #[tokio::test]
    async fn context_does_not_leak_past_the_scope() {
        RequestContext {
            locale: Some("ko-KR".into()),
            ..Default::default()
        }
        .scope(async {})
        .await;

        assert!(RequestContext::current().is_none());
    }
}
