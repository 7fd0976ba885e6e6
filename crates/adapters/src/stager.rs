// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage-in/stage-out transfer helpers.
//!
//! The helper reads the job's `.input`/`.output` list from the control dir,
//! transfers what it can, and reports through its exit code.

use crate::error::AdapterError;
use crate::subprocess::HelperCommand;
use arex_core::{HelperProcess, HelpersConfig, JobId, Owner};
use std::path::Path;

/// Exit code asking for a retry with backoff.
pub const EXIT_RETRYABLE: i32 = 4;

/// Which way files move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Download,
    Upload,
}

arex_core::named_enum! {
    Direction {
        Download => "download",
        Upload => "upload",
    }
}

/// Classified transfer helper exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferExit {
    Done,
    Retry,
    Failed(i32),
}

impl TransferExit {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => TransferExit::Done,
            EXIT_RETRYABLE => TransferExit::Retry,
            other => TransferExit::Failed(other),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StageRequest<'a> {
    pub id: &'a JobId,
    pub direction: Direction,
    pub owner: Owner,
    pub share: &'a str,
    pub control_dir: &'a Path,
    pub session_dir: &'a Path,
    pub errors_log: &'a Path,
}

/// Adapter for data staging
pub trait Stager: Send + Sync {
    fn start(&self, req: &StageRequest<'_>) -> Result<Box<dyn HelperProcess>, AdapterError>;
}

/// Runs the configured downloader or uploader:
/// `<helper> -U <uid:gid> [-s <share>] <id> <control_dir> <session_dir>`.
#[derive(Debug, Clone)]
pub struct HelperStager {
    helpers: HelpersConfig,
}

impl HelperStager {
    pub fn new(helpers: HelpersConfig) -> Self {
        Self { helpers }
    }

    pub fn command(&self, req: &StageRequest<'_>) -> HelperCommand {
        let program = match req.direction {
            Direction::Download => self.helpers.downloader(),
            Direction::Upload => self.helpers.uploader(),
        };
        let mut cmd = HelperCommand::new(program).arg("-U").arg(req.owner.to_string());
        if !req.share.is_empty() {
            cmd = cmd.arg("-s").arg(req.share);
        }
        cmd.arg(req.id.as_str()).arg(req.control_dir).arg(req.session_dir).log_to(req.errors_log)
    }
}

impl Stager for HelperStager {
    fn start(&self, req: &StageRequest<'_>) -> Result<Box<dyn HelperProcess>, AdapterError> {
        tracing::info!(job_id = %req.id, direction = %req.direction, "starting transfer helper");
        Ok(self.command(req).spawn()?.into_boxed())
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{Direction, StageRequest, Stager};
    use crate::error::AdapterError;
    use arex_core::test_support::ScriptedProcess;
    use arex_core::{HelperProcess, JobId};
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;

    /// Recorded staging call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct StageCall {
        pub id: JobId,
        pub direction: Direction,
    }

    #[derive(Default)]
    struct FakeStagerState {
        calls: Vec<StageCall>,
        queued: HashMap<Direction, VecDeque<ScriptedProcess>>,
    }

    /// Fake transfer helper for testing.
    ///
    /// With nothing queued for a direction the helper exits 0 on its first
    /// poll.
    #[derive(Clone, Default)]
    pub struct FakeStager {
        inner: Arc<Mutex<FakeStagerState>>,
    }

    impl FakeStager {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, direction: Direction, process: ScriptedProcess) {
            self.inner.lock().queued.entry(direction).or_default().push_back(process);
        }

        /// Queue helpers exiting with each code in turn.
        pub fn push_codes(&self, direction: Direction, codes: &[i32]) {
            for code in codes {
                self.push(direction, ScriptedProcess::exits_after(0, *code));
            }
        }

        pub fn calls(&self) -> Vec<StageCall> {
            self.inner.lock().calls.clone()
        }

        pub fn count(&self, direction: Direction) -> usize {
            self.inner.lock().calls.iter().filter(|c| c.direction == direction).count()
        }
    }

    impl Stager for FakeStager {
        fn start(&self, req: &StageRequest<'_>) -> Result<Box<dyn HelperProcess>, AdapterError> {
            let mut state = self.inner.lock();
            state.calls.push(StageCall { id: req.id.clone(), direction: req.direction });
            let process = state
                .queued
                .get_mut(&req.direction)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| ScriptedProcess::exits_after(0, 0));
            Ok(Box::new(process))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeStager, StageCall};

#[cfg(test)]
#[path = "stager_tests.rs"]
mod tests;
