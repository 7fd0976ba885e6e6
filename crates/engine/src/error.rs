// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use arex_storage::StorageError;
use thiserror::Error;

/// What the engine does with a job after one handler step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Nothing more to do this pass.
    Wait,
    /// Run the handler for the new state right away.
    Reprocess,
    /// Remove the job from memory.
    Drop,
}

/// Job-level failure returned by a state handler.
///
/// The reason, if any, is recorded by the common epilogue before the job is
/// pushed toward FINISHING.
#[derive(Debug, Default, Error)]
#[error("{}", reason.as_deref().unwrap_or("job failed"))]
pub struct JobFailure {
    reason: Option<String>,
}

impl JobFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: Some(reason.into()) }
    }

    /// Failure whose reason has already been recorded on the job.
    pub fn recorded() -> Self {
        Self { reason: None }
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

impl From<StorageError> for JobFailure {
    fn from(e: StorageError) -> Self {
        Self::new(format!("Internal error: {e}"))
    }
}

pub type HandlerResult = Result<Next, JobFailure>;

/// Aggregate result of one scheduling pass, for logging only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub processed: usize,
    /// Jobs whose persisted state changed.
    pub changed: usize,
    pub dropped: usize,
    /// Jobs that hit an internal failure and were forced to FINISHED.
    pub failed: usize,
}

impl PassSummary {
    pub fn is_ok(&self) -> bool {
        self.failed == 0
    }
}
