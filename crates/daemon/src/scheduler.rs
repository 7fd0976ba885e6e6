// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic driver for the job list.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::lifecycle::{DaemonState, LifecycleError};

/// Run scheduling passes every `wakeup_period` until `shutdown` resolves.
///
/// The first pass runs immediately. A pass that overruns the period delays
/// the next one instead of bursting.
pub async fn run(
    daemon: &mut DaemonState,
    shutdown: impl Future<Output = ()>,
) -> Result<(), LifecycleError> {
    let period = Duration::from_secs(daemon.config.wakeup_period.max(1));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = interval.tick() => pass(daemon).await?,
        }
    }
    Ok(())
}

/// One pass over all jobs, then the side processes.
///
/// Passes block on the filesystem and on helper processes, so they run on
/// the blocking pool.
pub async fn pass(daemon: &mut DaemonState) -> Result<(), LifecycleError> {
    let jobs = daemon.jobs.clone();
    let summary = tokio::task::spawn_blocking(move || jobs.lock().tick()).await?;
    if summary.is_ok() {
        debug!(
            processed = summary.processed,
            changed = summary.changed,
            dropped = summary.dropped,
            "pass complete"
        );
    } else {
        warn!(failed = summary.failed, processed = summary.processed, "pass had internal failures");
    }
    daemon.poll_side_processes();
    Ok(())
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
