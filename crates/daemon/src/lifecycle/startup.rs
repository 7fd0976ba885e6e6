// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and initialization logic.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arex_adapters::{HelperSupervisor, Reporter};
use arex_core::{GmConfig, SystemClock};
use arex_engine::{Collaborators, JobsList};
use arex_storage::{ControlStore, OwnerPolicy};
use fs2::FileExt;
use parking_lot::Mutex;
use tracing::info;

use super::{DaemonState, LifecycleError, LOCK_FILE};

/// Load the configuration, applying the control dir override last.
pub fn load_config(
    path: Option<PathBuf>,
    control_dir: Option<PathBuf>,
) -> Result<GmConfig, LifecycleError> {
    let mut config = match crate::env::config_path(path) {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            GmConfig::load(&path)?
        }
        None => GmConfig::default(),
    };
    if let Some(dir) = control_dir.or_else(crate::env::control_dir) {
        config.control_dir = dir;
    }
    Ok(config)
}

/// Start the grid-manager: take the lock, prepare the control dir and queue
/// interrupted jobs for recovery.
pub fn startup(config: GmConfig, policy: OwnerPolicy) -> Result<DaemonState, LifecycleError> {
    // 1. Create control dir (needed for the lock)
    std::fs::create_dir_all(&config.control_dir)?;

    // 2. Acquire lock file FIRST - prevents two engines on one control dir
    // Use OpenOptions to avoid truncating the file before we hold the lock,
    // which would wipe the running daemon's PID.
    let lock_path = config.control_dir.join(LOCK_FILE);
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file (truncate now that we hold the lock)
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file; // Drop mutability

    // 3. Bucket layout
    let store = ControlStore::with_policy(&config.control_dir, policy);
    store.ensure_layout()?;
    std::fs::create_dir_all(config.session_root())?;

    // 4. Everything left in processing was interrupted
    let deps = Collaborators::from_config(&config);
    let mut jobs = JobsList::new(config.clone(), store, deps, SystemClock);
    let recovered = jobs.restart_jobs()?;

    // 5. Side processes
    let helpers = HelperSupervisor::new(&config.helpers.long_running);
    let reporter = config
        .helpers
        .reporter
        .as_ref()
        .map(|cmd| Reporter::new(cmd.clone(), Duration::from_secs(config.helpers.reporter_interval)));

    info!(
        control_dir = %config.control_dir.display(),
        recovered,
        helpers = config.helpers.long_running.len(),
        "grid-manager started"
    );

    Ok(DaemonState {
        config,
        lock_path,
        lock_file,
        jobs: Arc::new(Mutex::new(jobs)),
        helpers,
        reporter,
        start_time: Instant::now(),
    })
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
