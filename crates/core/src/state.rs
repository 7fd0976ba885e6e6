// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job states and the persisted status record.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Processing state of a job.
///
/// Declaration order follows the normal flow, so `Ord` can be used for
/// range checks on the active pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JobState {
    /// Control file discovered, nothing read yet.
    Undefined,
    Accepted,
    /// Stage-in.
    Preparing,
    Submitting,
    InLrms,
    Canceling,
    /// Stage-out.
    Finishing,
    Finished,
    Deleted,
}

crate::named_enum! {
    JobState {
        Undefined => "UNDEFINED",
        Accepted => "ACCEPTED",
        Preparing => "PREPARING",
        Submitting => "SUBMIT" | "SUBMITTING",
        InLrms => "INLRMS",
        Canceling => "CANCELING",
        Finishing => "FINISHING",
        Finished => "FINISHED",
        Deleted => "DELETED",
    }
}

impl JobState {
    pub const ALL: [JobState; 9] = [
        JobState::Undefined,
        JobState::Accepted,
        JobState::Preparing,
        JobState::Submitting,
        JobState::InLrms,
        JobState::Canceling,
        JobState::Finishing,
        JobState::Finished,
        JobState::Deleted,
    ];

    /// Position in [`JobState::ALL`], for array-backed counters.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Occupies a per-identity slot (PREPARING through FINISHING).
    pub fn is_active(self) -> bool {
        (JobState::Preparing..=JobState::Finishing).contains(&self)
    }

    /// Counted against the tracked-jobs cap (ACCEPTED through FINISHING).
    pub fn is_tracked(self) -> bool {
        (JobState::Accepted..=JobState::Finishing).contains(&self)
    }

    pub fn is_staging(self) -> bool {
        matches!(self, JobState::Preparing | JobState::Finishing)
    }

    /// Submitted to, or running in, the LRMS.
    pub fn is_running(self) -> bool {
        matches!(self, JobState::Submitting | JobState::InLrms)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Finished | JobState::Deleted)
    }

    /// One-letter code used in e-mail notification flags.
    pub fn shortcut(self) -> Option<char> {
        match self {
            JobState::Accepted => Some('a'),
            JobState::Preparing => Some('b'),
            JobState::Submitting => Some('s'),
            JobState::InLrms => Some('q'),
            JobState::Finishing => Some('f'),
            JobState::Finished => Some('e'),
            JobState::Deleted => Some('d'),
            JobState::Canceling => Some('c'),
            JobState::Undefined => None,
        }
    }
}

const PENDING_PREFIX: &str = "PENDING:";

/// Content of a status file: `[PENDING:]<STATE>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRecord {
    pub state: JobState,
    pub pending: bool,
}

impl StatusRecord {
    pub fn new(state: JobState, pending: bool) -> Self {
        Self { state, pending }
    }

    /// Parse the first line of a status file. Unknown names yield `None`.
    pub fn parse(content: &str) -> Option<Self> {
        let line = content.lines().next().unwrap_or("").trim();
        let (pending, name) = match line.strip_prefix(PENDING_PREFIX) {
            Some(rest) => (true, rest),
            None => (false, line),
        };
        JobState::from_name(name).map(|state| Self { state, pending })
    }
}

impl fmt::Display for StatusRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pending {
            f.write_str(PENDING_PREFIX)?;
        }
        f.write_str(self.state.as_str())
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
