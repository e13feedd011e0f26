//! Recurring background job registration.
//!
//! Each job runs on a fixed tokio interval with a named single-flight guard:
//! if a tick is still running when the next one fires, the new tick is
//! skipped. Task errors are logged and never stop the schedule.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use tokio::time;

static RUNNING: Lazy<DashMap<String, Arc<AtomicBool>>> = Lazy::new(DashMap::new);

fn guard_for(name: &str) -> Arc<AtomicBool> {
    RUNNING
        .entry(name.to_string())
        .or_insert_with(|| Arc::new(AtomicBool::new(false)))
        .clone()
}

/// Try to mark the named job as running. Returns false if a tick is already
/// in flight.
pub fn try_acquire(name: &str) -> bool {
    guard_for(name)
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
}

pub fn release(name: &str) {
    guard_for(name).store(false, Ordering::Release);
}

/// Register a recurring job. Spawns a detached task; call once at startup.
pub fn register<F, Fut>(name: &'static str, period: Duration, task: F)
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = time::interval(period);
        // An overrunning task must not be followed by a burst of catch-up
        // ticks; skip straight to the next period boundary.
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
        // The first tick of a tokio interval fires immediately; skip it so
        // the job first runs one full period after startup.
        interval.tick().await;
        loop {
            interval.tick().await;
            // The task is awaited inline, so within this loop ticks never
            // overlap; the guard covers a second registration under the
            // same name.
            if !try_acquire(name) {
                tracing::warn!(job = name, "previous tick still running, skipping");
                continue;
            }
            let result = task().await;
            release(name);
            if let Err(e) = result {
                tracing::error!(job = name, "job tick failed: {:#}", e);
            }
        }
    });
    tracing::info!(job = name, period_secs = period.as_secs(), "registered recurring job");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_flight_guard_skips_overlap() {
        assert!(try_acquire("test-job"));
        assert!(!try_acquire("test-job"));
        release("test-job");
        assert!(try_acquire("test-job"));
        release("test-job");
    }

    #[test]
    fn guards_are_independent_per_name() {
        assert!(try_acquire("job-a"));
        assert!(try_acquire("job-b"));
        release("job-a");
        release("job-b");
    }
}
