// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Side processes living outside the per-job flow.
//!
//! - [`HelperSupervisor`] keeps long-running helpers (LRMS scanners) alive.
//! - [`Reporter`] starts the accounting reporter at most once per interval.

use crate::subprocess::{HelperCommand, OsProcess};
use arex_core::HelperProcess;
use std::time::{Duration, Instant};

/// Minimum gap between restarts of the same long-running helper.
pub const RESTART_DELAY: Duration = Duration::from_secs(10);

struct LongRunning {
    command: String,
    process: Option<OsProcess>,
    started_at: Option<Instant>,
}

/// Keeps configured long-running helpers running.
pub struct HelperSupervisor {
    helpers: Vec<LongRunning>,
}

impl HelperSupervisor {
    pub fn new(commands: &[String]) -> Self {
        let helpers = commands
            .iter()
            .map(|c| LongRunning { command: c.clone(), process: None, started_at: None })
            .collect();
        Self { helpers }
    }

    /// Restart any helper that has exited. Returns how many were started.
    pub fn poll(&mut self, now: Instant) -> usize {
        let mut started = 0;
        for helper in &mut self.helpers {
            if let Some(process) = &mut helper.process {
                match process.try_exit_code() {
                    None => continue,
                    Some(code) => {
                        tracing::warn!(command = %helper.command, code, "long-running helper exited");
                        helper.process = None;
                    }
                }
            }
            let recently = helper.started_at.is_some_and(|at| now.saturating_duration_since(at) < RESTART_DELAY);
            if recently {
                continue;
            }
            helper.started_at = Some(now);
            match HelperCommand::shell(&helper.command).spawn() {
                Ok(process) => {
                    tracing::info!(command = %helper.command, pid = ?process.pid(), "long-running helper started");
                    helper.process = Some(process);
                    started += 1;
                }
                Err(e) => tracing::error!(command = %helper.command, error = %e, "failed to start helper"),
            }
        }
        started
    }

    pub fn running(&self) -> usize {
        self.helpers.iter().filter(|h| h.process.is_some()).count()
    }

    pub fn shutdown(&mut self) {
        for helper in &mut self.helpers {
            if let Some(mut process) = helper.process.take() {
                tracing::info!(command = %helper.command, "stopping long-running helper");
                process.kill();
            }
        }
    }
}

/// Periodic accounting reporter.
pub struct Reporter {
    command: String,
    interval: Duration,
    process: Option<OsProcess>,
    last_run: Option<Instant>,
}

impl Reporter {
    pub fn new(command: impl Into<String>, interval: Duration) -> Self {
        Self { command: command.into(), interval, process: None, last_run: None }
    }

    /// Start a run if the previous one exited and the interval has passed.
    /// Returns whether a run was started.
    pub fn poll(&mut self, now: Instant) -> bool {
        if let Some(process) = &mut self.process {
            match process.try_exit_code() {
                None => return false,
                Some(0) => {}
                Some(code) => tracing::warn!(command = %self.command, code, "reporter failed"),
            }
            self.process = None;
        }
        if self.last_run.is_some_and(|at| now.saturating_duration_since(at) < self.interval) {
            return false;
        }
        self.last_run = Some(now);
        match HelperCommand::shell(&self.command).spawn() {
            Ok(process) => {
                tracing::debug!(command = %self.command, "reporter started");
                self.process = Some(process);
                true
            }
            Err(e) => {
                tracing::error!(command = %self.command, error = %e, "failed to start reporter");
                false
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.process.is_some()
    }

    pub fn shutdown(&mut self) {
        if let Some(mut process) = self.process.take() {
            process.kill();
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
