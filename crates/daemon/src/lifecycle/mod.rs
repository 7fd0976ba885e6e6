// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

mod startup;
pub use startup::{load_config, startup};

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use arex_adapters::{HelperSupervisor, Reporter};
use arex_core::{ConfigError, GmConfig, SystemClock};
use arex_engine::JobsList;
use arex_storage::StorageError;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{info, warn};

/// Job list as driven by the daemon
pub type DaemonJobs = JobsList<SystemClock>;

/// Name of the lock/PID file inside the control dir.
pub const LOCK_FILE: &str = "gm.pid";

/// Daemon state during operation.
pub struct DaemonState {
    pub config: GmConfig,
    lock_path: PathBuf,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Shared with the blocking task running each pass
    pub jobs: Arc<Mutex<DaemonJobs>>,
    /// Long-running LRMS scanners
    pub helpers: HelperSupervisor,
    pub reporter: Option<Reporter>,
    pub start_time: Instant,
}

impl DaemonState {
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Keep long-running helpers alive and kick the reporter when due.
    pub fn poll_side_processes(&mut self) {
        let now = Instant::now();
        let restarted = self.helpers.poll(now);
        if restarted > 0 {
            info!(restarted, running = self.helpers.running(), "long-running helpers started");
        }
        if let Some(reporter) = &mut self.reporter {
            reporter.poll(now);
        }
    }

    /// Shutdown the daemon gracefully.
    ///
    /// Every helper is killed. Jobs caught mid-flight stay in `processing` and
    /// are recovered through `restarting` on the next startup.
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down grid-manager...");

        // 1. Per-job helpers
        self.jobs.lock().release_helpers();

        // 2. Side processes
        self.helpers.shutdown();
        if let Some(reporter) = &mut self.reporter {
            reporter.shutdown();
        }

        // 3. Remove PID file
        if self.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        // 4. Lock file is released automatically when self.lock_file is dropped

        info!(uptime_secs = self.start_time.elapsed().as_secs(), "grid-manager shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Failed to acquire lock: grid-manager already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Control dir error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scheduling pass aborted: {0}")]
    Pass(#[from] tokio::task::JoinError),
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
