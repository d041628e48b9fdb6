//! Handoff of the diagnostic context across a task boundary.
//!
//! Request-handling code runs with a [`RequestContext`] installed in its own
//! task; a task spawned with plain `tokio::spawn` would not see it. This
//! module's spawn wrapper snapshots the caller's context and re-installs it
//! around the spawned future, so background log construction reads the same
//! fields the request thread captured.
//!
//! The installed context lives inside the spawned task's scope and is
//! dropped with it — on completion, cancellation, or panic — so a worker
//! thread recycled for an unrelated task can never observe leftover context.
use std::future::Future;

use tokio::task::JoinHandle;

use crate::context::RequestContext;

/// Spawns `task`, carrying the caller's diagnostic context into it.
///
/// A caller with no installed context spawns the task bare; the task then
/// sees [`RequestContext::current`] as `None`.
pub fn spawn_with_context<F>(task: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match RequestContext::current() {
        Some(ctx) => tokio::spawn(ctx.scope(task)),
        None => tokio::spawn(task),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawned_task_sees_the_callers_context() {
        let ctx = RequestContext {
            client_addr: Some("10.0.0.7".into()),
            handler: Some("story::create".into()),
            ..Default::default()
        };

        let seen = ctx
            .scope(async {
                spawn_with_context(async {
                    RequestContext::current().expect("context should cross the handoff")
                })
                .await
                .unwrap()
            })
            .await;

        assert_eq!(seen.client_addr.as_deref(), Some("10.0.0.7"));
        assert_eq!(seen.handler.as_deref(), Some("story::create"));
    }

    #[tokio::test]
    async fn task_spawned_without_context_sees_none() {
        let seen = spawn_with_context(async { RequestContext::current() })
            .await
            .unwrap();
        assert!(seen.is_none());
    }

    #[tokio::test]
    async fn context_is_cleared_even_when_the_task_panics() {
        let ctx = RequestContext {
            locale: Some("ko-KR".into()),
            ..Default::default()
        };

        let result = ctx
            .scope(async {
                spawn_with_context(async {
                    panic!("boom");
                })
                .await
            })
            .await;
        assert!(result.is_err());

        // A later, unrelated task starts with an empty slot.
        let seen = spawn_with_context(async { RequestContext::current() })
            .await
            .unwrap();
        assert!(seen.is_none());
    }
}
