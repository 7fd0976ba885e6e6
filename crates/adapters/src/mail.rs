// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! E-mail notification on job state changes.
//!
//! The local description's `notify` value is a sequence of flag words and
//! addresses: `"bqfe alice@example.org ec bob@example.org"`. Flags apply to
//! the addresses that follow them; an address with no preceding flags uses
//! [`DEFAULT_FLAGS`]. Each flag is a [`JobState::shortcut`].

use crate::error::AdapterError;
use crate::subprocess::{HelperCommand, OsProcess};
use arex_core::{HelperProcess, JobId, JobState};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// Flags used for addresses without explicit flags.
pub const DEFAULT_FLAGS: &str = "be";

/// Addresses from `notify` that asked for mail on `state`.
pub fn recipients(notify: &str, state: JobState) -> Vec<String> {
    let Some(flag) = state.shortcut() else {
        return Vec::new();
    };
    let mut flags = DEFAULT_FLAGS;
    let mut out = Vec::new();
    for word in notify.split_whitespace() {
        if word.contains('@') {
            if flags.contains(flag) && !out.iter().any(|a| a == word) {
                out.push(word.to_string());
            }
        } else {
            flags = word;
        }
    }
    out
}

#[derive(Debug, Clone, Copy)]
pub struct MailMessage<'a> {
    pub id: &'a JobId,
    pub state: JobState,
    pub jobname: &'a str,
    /// Failure reason, empty for successful jobs.
    pub failure: &'a str,
    pub recipients: &'a [String],
}

/// Adapter for sending job notifications
pub trait MailNotifier: Send + Sync {
    /// Best-effort and non-blocking; errors are for logging only.
    fn send(&self, msg: &MailMessage<'_>) -> Result<(), AdapterError>;
}

/// Hands mail to an external command:
/// `<program> <job-id> <STATE> <address>...` with the job name and failure
/// reason in `AREX_JOBNAME` and `AREX_FAILURE`.
#[derive(Clone)]
pub struct CommandMailer {
    program: PathBuf,
    // Spawned senders, reaped on later sends
    inflight: Arc<Mutex<Vec<OsProcess>>>,
}

impl CommandMailer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), inflight: Arc::new(Mutex::new(Vec::new())) }
    }

    pub fn command(&self, msg: &MailMessage<'_>) -> HelperCommand {
        HelperCommand::new(&self.program)
            .arg(msg.id.as_str())
            .arg(msg.state.as_str())
            .args(msg.recipients.iter())
            .env("AREX_JOBNAME", msg.jobname)
            .env("AREX_FAILURE", msg.failure)
    }

    /// Senders still running.
    pub fn inflight(&self) -> usize {
        let mut inflight = self.inflight.lock();
        inflight.retain_mut(|p| p.try_exit_code().is_none());
        inflight.len()
    }
}

impl MailNotifier for CommandMailer {
    fn send(&self, msg: &MailMessage<'_>) -> Result<(), AdapterError> {
        if msg.recipients.is_empty() {
            return Ok(());
        }
        let process = self.command(msg).spawn()?;
        tracing::info!(job_id = %msg.id, state = %msg.state, recipients = msg.recipients.len(), "sending mail");
        let mut inflight = self.inflight.lock();
        inflight.retain_mut(|p| p.try_exit_code().is_none());
        inflight.push(process);
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{MailMessage, MailNotifier};
    use crate::error::AdapterError;
    use arex_core::{JobId, JobState};
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Recorded mail
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct MailCall {
        pub id: JobId,
        pub state: JobState,
        pub failure: String,
        pub recipients: Vec<String>,
    }

    /// Fake mailer for testing
    #[derive(Clone, Default)]
    pub struct FakeMailer {
        calls: Arc<Mutex<Vec<MailCall>>>,
    }

    impl FakeMailer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<MailCall> {
            self.calls.lock().clone()
        }
    }

    impl MailNotifier for FakeMailer {
        fn send(&self, msg: &MailMessage<'_>) -> Result<(), AdapterError> {
            self.calls.lock().push(MailCall {
                id: msg.id.clone(),
                state: msg.state,
                failure: msg.failure.to_string(),
                recipients: msg.recipients.to_vec(),
            });
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeMailer, MailCall};

#[cfg(test)]
#[path = "mail_tests.rs"]
mod tests;
