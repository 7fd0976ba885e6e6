// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handles to out-of-process helpers.
//!
//! The engine never blocks on a helper. It polls [`ChildHandle::poll`] once
//! per pass and compares [`ChildHandle::running_for`] against its timeouts.

use std::fmt;
use std::time::{Duration, Instant};

/// Exit code reported for a helper terminated by a signal or lost entirely.
pub const EXIT_LOST: i32 = -1;

/// A running helper process.
pub trait HelperProcess: Send {
    /// Non-blocking exit check: `Some(code)` once the process has exited.
    fn try_exit_code(&mut self) -> Option<i32>;

    /// Best-effort termination. No guarantee the process is gone on return.
    fn kill(&mut self);

    fn pid(&self) -> Option<u32> {
        None
    }
}

/// Exclusively owned helper process plus its bookkeeping.
pub struct ChildHandle {
    process: Box<dyn HelperProcess>,
    started_at: Instant,
    exit: Option<(i32, Instant)>,
}

impl ChildHandle {
    pub fn new(process: Box<dyn HelperProcess>, started_at: Instant) -> Self {
        Self { process, started_at, exit: None }
    }

    /// Exit code if the helper has exited. The first observed exit is latched.
    pub fn poll(&mut self, now: Instant) -> Option<i32> {
        if let Some((code, _)) = self.exit {
            return Some(code);
        }
        let code = self.process.try_exit_code()?;
        self.exit = Some((code, now));
        Some(code)
    }

    pub fn running_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    /// When the exit was first observed.
    pub fn exited_at(&self) -> Option<Instant> {
        self.exit.map(|(_, at)| at)
    }

    pub fn kill(&mut self) {
        if self.exit.is_none() {
            self.process.kill();
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.process.pid()
    }
}

impl fmt::Debug for ChildHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildHandle")
            .field("pid", &self.process.pid())
            .field("started_at", &self.started_at)
            .field("exit", &self.exit.map(|(code, _)| code))
            .finish()
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
