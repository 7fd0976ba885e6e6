// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LRMS submit and cancel helpers.
//!
//! A successful submit helper records the LRMS-native job id in the grami
//! file; the engine reads it back from there. Cancel completion may instead
//! be signalled through the `lrms_done` mark.

use crate::error::AdapterError;
use crate::subprocess::HelperCommand;
use arex_core::{HelperProcess, HelpersConfig, JobId};
use std::path::Path;

/// Arguments shared by submit and cancel.
#[derive(Debug, Clone, Copy)]
pub struct LrmsRequest<'a> {
    pub id: &'a JobId,
    /// LRMS name from the local description; empty means the default LRMS.
    pub lrms: &'a str,
    pub grami: &'a Path,
    /// Per-job log receiving the helper's output.
    pub errors_log: &'a Path,
}

/// Adapter for the local resource management system
pub trait LrmsAdapter: Send + Sync {
    fn submit(&self, req: &LrmsRequest<'_>) -> Result<Box<dyn HelperProcess>, AdapterError>;
    fn cancel(&self, req: &LrmsRequest<'_>) -> Result<Box<dyn HelperProcess>, AdapterError>;
}

/// Runs `<libexec>/<action>-<lrms>-job [--config FILE] <grami>`.
#[derive(Debug, Clone)]
pub struct ScriptLrms {
    helpers: HelpersConfig,
}

impl ScriptLrms {
    pub fn new(helpers: HelpersConfig) -> Self {
        Self { helpers }
    }

    pub fn command(&self, action: &str, req: &LrmsRequest<'_>) -> HelperCommand {
        let mut cmd = HelperCommand::new(self.helpers.lrms_script(action, req.lrms));
        if let Some(config) = &self.helpers.config_file {
            cmd = cmd.arg("--config").arg(config);
        }
        cmd.arg(req.grami).log_to(req.errors_log)
    }

    fn run(&self, action: &str, req: &LrmsRequest<'_>) -> Result<Box<dyn HelperProcess>, AdapterError> {
        tracing::info!(job_id = %req.id, action, lrms = req.lrms, "starting LRMS helper");
        Ok(self.command(action, req).spawn()?.into_boxed())
    }
}

impl LrmsAdapter for ScriptLrms {
    fn submit(&self, req: &LrmsRequest<'_>) -> Result<Box<dyn HelperProcess>, AdapterError> {
        self.run("submit", req)
    }

    fn cancel(&self, req: &LrmsRequest<'_>) -> Result<Box<dyn HelperProcess>, AdapterError> {
        self.run("cancel", req)
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{LrmsAdapter, LrmsRequest};
    use crate::error::AdapterError;
    use arex_core::test_support::ScriptedProcess;
    use arex_core::{HelperProcess, JobId};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Recorded LRMS call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum LrmsCall {
        Submit(JobId),
        Cancel(JobId),
    }

    #[derive(Default)]
    struct FakeLrmsState {
        calls: Vec<LrmsCall>,
        submits: VecDeque<ScriptedProcess>,
        cancels: VecDeque<ScriptedProcess>,
        fail_spawn: bool,
    }

    /// Fake LRMS for testing.
    ///
    /// Hands out queued scripted processes; with an empty queue the helper
    /// exits 0 on its first poll.
    #[derive(Clone, Default)]
    pub struct FakeLrms {
        inner: Arc<Mutex<FakeLrmsState>>,
    }

    impl FakeLrms {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_submit(&self, process: ScriptedProcess) {
            self.inner.lock().submits.push_back(process);
        }

        pub fn push_cancel(&self, process: ScriptedProcess) {
            self.inner.lock().cancels.push_back(process);
        }

        /// Make every subsequent call fail to start.
        pub fn fail_spawn(&self) {
            self.inner.lock().fail_spawn = true;
        }

        pub fn calls(&self) -> Vec<LrmsCall> {
            self.inner.lock().calls.clone()
        }

        pub fn cancel_count(&self) -> usize {
            self.calls().iter().filter(|c| matches!(c, LrmsCall::Cancel(_))).count()
        }

        fn take(&self, call: LrmsCall) -> Result<Box<dyn HelperProcess>, AdapterError> {
            let mut state = self.inner.lock();
            let queue = match call {
                LrmsCall::Submit(_) => &mut state.submits,
                LrmsCall::Cancel(_) => &mut state.cancels,
            };
            let process = queue.pop_front().unwrap_or_else(|| ScriptedProcess::exits_after(0, 0));
            state.calls.push(call);
            if state.fail_spawn {
                return Err(AdapterError::Spawn {
                    program: "fake-lrms".to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such helper"),
                });
            }
            Ok(Box::new(process))
        }
    }

    impl LrmsAdapter for FakeLrms {
        fn submit(&self, req: &LrmsRequest<'_>) -> Result<Box<dyn HelperProcess>, AdapterError> {
            self.take(LrmsCall::Submit(req.id.clone()))
        }

        fn cancel(&self, req: &LrmsRequest<'_>) -> Result<Box<dyn HelperProcess>, AdapterError> {
            self.take(LrmsCall::Cancel(req.id.clone()))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeLrms, LrmsCall};

#[cfg(test)]
#[path = "lrms_tests.rs"]
mod tests;
