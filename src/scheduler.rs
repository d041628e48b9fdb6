//! Timer registration for the scheduled flush sweeps.
//!
//! Three independent timers, registered explicitly at startup:
//! - a long-period, high-threshold sweep for Read entries, which dominate
//!   volume and tolerate delay;
//! - a shorter, low-threshold sweep for the mutation kinds (Create, Update,
//!   Delete, Other), which are rarer and should reach storage sooner;
//! - the longest-period forced full sweep, which persists everything left
//!   regardless of kind or count and is the guaranteed reclamation path.
//!
//! Each timer starts after an initial delay so process start does not
//! trigger a thundering-herd flush. A failed sweep is logged and the timer
//! keeps ticking.
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, error};

use crate::classify::OperationKind;
use crate::flusher::LogFlusher;

/// The kinds covered by the short-period mutation sweep.
const MUTATION_KINDS: [OperationKind; 4] = [
    OperationKind::Create,
    OperationKind::Update,
    OperationKind::Delete,
    OperationKind::Other,
];

/// Periods, initial delays and count thresholds for the three sweeps.
#[derive(Debug, Clone)]
pub struct FlushSchedule {
    pub read_period: Duration,
    pub read_start_delay: Duration,
    pub read_threshold: usize,
    pub mutation_period: Duration,
    pub mutation_start_delay: Duration,
    pub mutation_threshold: usize,
    pub full_period: Duration,
    pub full_start_delay: Duration,
}

impl Default for FlushSchedule {
    fn default() -> Self {
        Self {
            read_period: Duration::from_secs(10 * 60),
            read_start_delay: Duration::from_secs(2 * 60),
            read_threshold: 30,
            mutation_period: Duration::from_secs(2 * 60),
            mutation_start_delay: Duration::from_secs(60),
            mutation_threshold: 3,
            full_period: Duration::from_secs(30 * 60),
            full_start_delay: Duration::from_secs(5 * 60),
        }
    }
}

/// Registers the three flush timers and returns their task handles.
///
/// The handles can be aborted to stop scheduling; a final
/// [`LogFlusher::flush_all`] afterwards picks up whatever is still buffered.
pub fn spawn_flush_timers(
    flusher: Arc<LogFlusher>,
    schedule: &FlushSchedule,
) -> Vec<JoinHandle<()>> {
    let read = {
        let flusher = flusher.clone();
        let threshold = schedule.read_threshold;
        spawn_sweep(
            "read",
            schedule.read_start_delay,
            schedule.read_period,
            move || {
                let flusher = flusher.clone();
                async move { flusher.flush_by_kind(OperationKind::Read, threshold).await }
            },
        )
    };

    let mutation = {
        let flusher = flusher.clone();
        let threshold = schedule.mutation_threshold;
        spawn_sweep(
            "mutation",
            schedule.mutation_start_delay,
            schedule.mutation_period,
            move || {
                let flusher = flusher.clone();
                async move {
                    let mut written = 0;
                    for kind in MUTATION_KINDS {
                        written += flusher.flush_by_kind(kind, threshold).await?;
                    }
                    Ok(written)
                }
            },
        )
    };

    let full = spawn_sweep(
        "full",
        schedule.full_start_delay,
        schedule.full_period,
        move || {
            let flusher = flusher.clone();
            async move { flusher.flush_all().await }
        },
    );

    vec![read, mutation, full]
}

/// Spawns one timer loop: wait out the start delay, then run `sweep` once
/// per period. Sweep failures are logged and never end the loop.
fn spawn_sweep<F, Fut>(
    name: &'static str,
    start_delay: Duration,
    period: Duration,
    sweep: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<usize>> + Send,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + start_delay, period);
        loop {
            ticker.tick().await;
            match sweep().await {
                Ok(0) => {}
                Ok(written) => debug!(sweep = name, records = written, "scheduled sweep persisted records"),
                Err(e) => error!(sweep = name, error = %e, "scheduled sweep failed"),
            }
        }
    })
}
