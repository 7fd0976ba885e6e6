// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SUBMITTING, INLRMS and CANCELING: the job's time in the batch system

use super::{Engine, HelperPoll};
use crate::error::{HandlerResult, JobFailure, Next};
use arex_adapters::{Direction, LrmsRequest};
use arex_core::{ChildHandle, Clock, GmJob, JobState, EXIT_LOST};
use arex_storage::ControlFile;

#[derive(Clone, Copy)]
enum LrmsAction {
    Submit,
    Cancel,
}

impl<C: Clock> Engine<C> {
    pub(super) fn state_submitting(&mut self, job: &mut GmJob) -> HandlerResult {
        match self.poll_helper(job) {
            HelperPoll::Idle => {
                if self.store.grami_local_id(&job.id).is_some() {
                    // Submitted before a restart
                    return self.submitted(job);
                }
                self.start_lrms_helper(job, LrmsAction::Submit)
            }
            HelperPoll::Running => Ok(Next::Wait),
            HelperPoll::Suspicious => {
                if self.store.grami_local_id(&job.id).is_none() {
                    return Ok(Next::Wait);
                }
                tracing::warn!(job_id = %job.id, "submission runs long but LRMS id is known");
                self.release_child(job);
                self.submitted(job)
            }
            HelperPoll::TimedOut => Err(JobFailure::new("Job submission to LRMS takes too long")),
            HelperPoll::Exited(code) => {
                self.release_child(job);
                if code != 0 && code != EXIT_LOST {
                    tracing::error!(job_id = %job.id, code, "submit helper failed");
                    return Err(JobFailure::new("Job submission to LRMS failed"));
                }
                self.submitted(job)
            }
        }
    }

    fn submitted(&mut self, job: &mut GmJob) -> HandlerResult {
        let Some(localid) = self.store.grami_local_id(&job.id) else {
            tracing::error!(job_id = %job.id, "submit helper left no LRMS id");
            return Err(JobFailure::new("Failed extracting LRMS ID due to some internal error"));
        };
        tracing::info!(job_id = %job.id, local_id = %localid, "submitted to LRMS");
        if let Some(local) = job.local.as_mut() {
            local.localid = localid;
            self.store.write_local(&job.id, local)?;
        }
        job.state = JobState::InLrms;
        job.pending = false;
        Ok(Next::Reprocess)
    }

    /// Wait for the LRMS to report the job done, then admit it to stage-out.
    ///
    /// A pending INLRMS job has had its LRMS outcome processed already and is
    /// only waiting for a staging slot or a retry deadline.
    pub(super) fn state_inlrms(&mut self, job: &mut GmJob) -> HandlerResult {
        if !job.pending {
            let Some(result) = self.store.lrms_done(&job.id) else {
                return Ok(Next::Wait);
            };
            let session_dir = self.session_dir(job);
            if let Err(e) = self.store.take_session_diag(&job.id, &session_dir) {
                tracing::warn!(job_id = %job.id, error = %e, "failed collecting diagnostics");
            }
            let successcode = job.local.as_ref().map_or(0, |l| l.successcode);
            if result.code != successcode {
                tracing::info!(job_id = %job.id, code = result.code, "job failed in LRMS");
                return Err(JobFailure::new(format!(
                    "LRMS error: ({}) {}",
                    result.code, result.description
                )));
            }
            tracing::info!(job_id = %job.id, "job finished executing in LRMS");
            if job.next_retry.is_none() {
                job.retries = self.config.max_retries;
            }
        }
        if job.next_retry.is_some_and(|at| at > self.now()) {
            return Ok(Next::Wait);
        }
        if !self.admit_staging(job, Direction::Upload) {
            self.set_pending(job, "Limit of FINISHING jobs is reached");
            return Ok(Next::Wait);
        }
        job.state = JobState::Finishing;
        job.pending = false;
        Ok(Next::Reprocess)
    }

    pub(super) fn state_canceling(&mut self, job: &mut GmJob) -> HandlerResult {
        match self.poll_helper(job) {
            HelperPoll::Idle => {
                if self.store.has_lrms_done(&job.id) {
                    tracing::info!(job_id = %job.id, "job completed already, nothing to cancel");
                    return Ok(self.canceled(job));
                }
                self.start_lrms_helper(job, LrmsAction::Cancel)
            }
            HelperPoll::Running => Ok(Next::Wait),
            HelperPoll::Suspicious => {
                if !self.store.has_lrms_done(&job.id) {
                    return Ok(Next::Wait);
                }
                tracing::warn!(job_id = %job.id, "cancellation runs long but diagnostics are collected");
                self.release_child(job);
                Ok(self.canceled(job))
            }
            HelperPoll::TimedOut => Err(JobFailure::new("Job cancellation takes too long")),
            HelperPoll::Exited(code) => {
                self.release_child(job);
                if code != 0 && code != EXIT_LOST {
                    tracing::error!(job_id = %job.id, code, "cancel helper failed");
                    return Err(JobFailure::new("Failed to cancel running job"));
                }
                Ok(self.canceled(job))
            }
        }
    }

    fn canceled(&mut self, job: &mut GmJob) -> Next {
        let session_dir = self.session_dir(job);
        if let Err(e) = self.store.take_session_diag(&job.id, &session_dir) {
            tracing::warn!(job_id = %job.id, error = %e, "failed collecting diagnostics");
        }
        tracing::info!(job_id = %job.id, "job cancellation succeeded");
        job.state = JobState::Finishing;
        job.pending = false;
        Next::Reprocess
    }

    /// Start a submit or cancel helper, respecting the script limit.
    fn start_lrms_helper(&mut self, job: &mut GmJob, action: LrmsAction) -> HandlerResult {
        if !self.config.max_scripts.allows(self.scripts) {
            tracing::debug!(job_id = %job.id, scripts = self.scripts, "LRMS script limit reached");
            return Ok(Next::Wait);
        }
        let failed = match action {
            LrmsAction::Submit => "Failed initiating job submission to LRMS",
            LrmsAction::Cancel => "Failed initiating job cancellation",
        };
        let Some(local) = job.local.as_ref() else {
            return Err(JobFailure::new(failed));
        };
        let grami_path = self.store.control_path(&job.id, ControlFile::Grami);
        let grami = match action {
            LrmsAction::Cancel if grami_path.is_file() => grami_path,
            _ => self.store.write_grami(&job.id, local, &self.session_dir(job)).map_err(|e| {
                tracing::error!(job_id = %job.id, error = %e, "failed writing job requirements");
                JobFailure::new(failed)
            })?,
        };
        let lrms =
            if local.lrms.is_empty() { self.config.helpers.default_lrms.as_str() } else { &local.lrms };
        let errors_log = self.store.control_path(&job.id, ControlFile::Errors);
        let req = LrmsRequest { id: &job.id, lrms, grami: &grami, errors_log: &errors_log };
        let spawned = match action {
            LrmsAction::Submit => self.deps.lrms.submit(&req),
            LrmsAction::Cancel => self.deps.lrms.cancel(&req),
        };
        match spawned {
            Ok(process) => {
                tracing::info!(job_id = %job.id, lrms, "LRMS helper started");
                job.child = Some(ChildHandle::new(process, self.clock.now()));
                self.scripts += 1;
                Ok(Next::Wait)
            }
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "failed to start LRMS helper");
                Err(JobFailure::new(failed))
            }
        }
    }
}
