// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory job record.

use crate::local::LocalDescription;
use crate::process::ChildHandle;
use crate::state::JobState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

crate::define_id! {
    /// Job identifier assigned at submission.
    ///
    /// Used verbatim in control-file names.
    pub struct JobId;
}

/// Owning identity of a job, taken from its status file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

impl Owner {
    pub fn new(uid: u32, gid: u32) -> Self {
        Self { uid, gid }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.uid, self.gid)
    }
}

/// One job tracked by the engine.
#[derive(Debug)]
pub struct GmJob {
    pub id: JobId,
    pub owner: Owner,
    pub state: JobState,
    /// Blocked on an admission limit rather than being processed.
    pub pending: bool,
    /// Remaining retryable staging failures.
    pub retries: u32,
    /// Epoch seconds before which a retried job must not proceed.
    pub next_retry: Option<u64>,
    pub transfer_share: String,
    pub session_dir: Option<PathBuf>,
    /// At most one helper per job.
    pub child: Option<ChildHandle>,
    pub local: Option<LocalDescription>,
    /// Epoch seconds at which the current phase began.
    pub start_time: Option<u64>,
    pub keep_finished: u64,
    pub keep_deleted: u64,
    failure: String,
}

crate::builder! {
    pub struct GmJobBuilder => GmJob {
        into {
            id: JobId = "job-1",
            transfer_share: String = "",
        }
        set {
            owner: Owner = Owner::new(1000, 1000),
            state: JobState = JobState::Undefined,
            pending: bool = false,
            retries: u32 = 10,
            keep_finished: u64 = 604_800,
            keep_deleted: u64 = 2_592_000,
        }
        option {
            local: LocalDescription = None,
            session_dir: PathBuf = None,
        }
        computed {
            next_retry: Option<u64> = None,
            child: Option<ChildHandle> = None,
            start_time: Option<u64> = None,
            failure: String = String::new(),
        }
    }
}

impl GmJob {
    pub fn new(id: JobId, owner: Owner, state: JobState) -> Self {
        Self {
            id,
            owner,
            state,
            pending: false,
            retries: 0,
            next_retry: None,
            transfer_share: String::new(),
            session_dir: None,
            child: None,
            local: None,
            start_time: None,
            keep_finished: 0,
            keep_deleted: 0,
            failure: String::new(),
        }
    }

    /// Stamp the beginning of processing.
    pub fn start(&mut self, now: u64) {
        self.start_time = Some(now);
    }

    /// Accumulate a failure reason. Empty reasons are ignored.
    pub fn add_failure(&mut self, reason: &str) {
        let reason = reason.trim();
        if reason.is_empty() {
            return;
        }
        if !self.failure.is_empty() {
            self.failure.push('\n');
        }
        self.failure.push_str(reason);
    }

    /// Accumulated, not yet flushed, failure reasons.
    pub fn failure(&self) -> &str {
        &self.failure
    }

    /// Take the accumulated reasons for flushing to disk.
    pub fn take_failure(&mut self) -> String {
        std::mem::take(&mut self.failure)
    }

    /// Owning identity used for per-identity accounting.
    pub fn subject(&self) -> &str {
        self.local.as_ref().map(|l| l.subject.as_str()).unwrap_or("")
    }

    pub fn has_executable(&self) -> bool {
        self.local.as_ref().is_some_and(|l| l.has_executable())
    }

    /// Drop the helper handle, killing the process if still running.
    pub fn release_child(&mut self) {
        if let Some(mut child) = self.child.take() {
            child.kill();
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
