// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Side effects of a persisted state change

use super::Engine;
use crate::error::Next;
use arex_adapters::{recipients, MailMessage, PluginContext};
use arex_core::{Clock, GmJob, JobState, PluginAction};
use arex_storage::StorageError;

impl<C: Clock> Engine<C> {
    /// Run plugins, accounting and mail for a change from `from` to the job's
    /// current state. Runs once per persisted change.
    pub(super) fn state_changed(
        &mut self,
        job: &mut GmJob,
        from: JobState,
        next: Next,
    ) -> Result<Next, StorageError> {
        let to = job.state;
        tracing::info!(job_id = %job.id, from = %from, to = %to, "state changed");
        self.store.append_errors(&job.id, to, &format!("State changed from {from}"));

        let plugins_ok = self.run_plugins(job);

        if matches!(to, JobState::Accepted | JobState::Finished) {
            let now = self.now();
            let submitted = job
                .local
                .as_ref()
                .and_then(|l| l.starttime)
                .or(job.start_time)
                .unwrap_or(now);
            let failure = self.store.read_failure(&job.id);
            self.job_log.write_record(job, submitted, now, failure.as_deref());
        }
        match to {
            JobState::Preparing => self.job_log.started(job),
            JobState::Finished => {
                if let Err(e) = self.store.clean_finished(&job.id) {
                    tracing::warn!(job_id = %job.id, error = %e, "failed cleaning finished job files");
                }
                let failure = self.store.read_failure(&job.id);
                self.job_log.finished(job, failure.as_deref());
            }
            _ => {}
        }

        self.send_mail(job);

        if !plugins_ok {
            return self.act_job_failed(job);
        }
        Ok(next)
    }

    /// True unless a plugin asked to fail the job.
    fn run_plugins(&self, job: &mut GmJob) -> bool {
        let session_root = self.config.session_root();
        let ctx = PluginContext {
            id: &job.id,
            state: job.state,
            control_dir: self.store.root(),
            session_root: &session_root,
        };
        let mut ok = true;
        for outcome in self.deps.plugins.run(&ctx) {
            match outcome.action {
                PluginAction::Fail => {
                    tracing::error!(job_id = %job.id, state = %job.state, response = %outcome.response, "plugin failed job");
                    job.add_failure(&format!("Plugin at state {} failed: {}", job.state, outcome.response));
                    ok = false;
                }
                PluginAction::Log => {
                    tracing::warn!(job_id = %job.id, state = %job.state, response = %outcome.response, "plugin");
                }
                PluginAction::Pass => {}
            }
        }
        ok
    }

    fn send_mail(&self, job: &GmJob) {
        let Some(local) = job.local.as_ref() else { return };
        let to = recipients(&local.notify, job.state);
        if to.is_empty() {
            return;
        }
        let failure = self.store.read_failure(&job.id).unwrap_or_default();
        let msg = MailMessage {
            id: &job.id,
            state: job.state,
            jobname: &local.jobname,
            failure: &failure,
            recipients: &to,
        };
        if let Err(e) = self.deps.mailer.send(&msg) {
            tracing::warn!(job_id = %job.id, state = %job.state, error = %e, "failed sending notification");
        }
    }
}
