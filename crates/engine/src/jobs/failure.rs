// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure handling and user cancellation

use super::Engine;
use crate::error::{HandlerResult, Next};
use arex_core::{Clock, FileData, GmJob, JobState, StatusRecord};
use arex_storage::{Mark, StorageError, TransferList};

const CANCEL_REASON: &str = "User requested to cancel the job.";
const INTERNAL_FAILURE: &str = "Serious troubles (problems during processing problems)";

impl<C: Clock> Engine<C> {
    /// Turn a failed handler step into a transition.
    ///
    /// FINISHING fails to FINISHED, terminal states are dropped and everything
    /// else moves to FINISHING so partial results can still be staged out.
    /// An error here means the failure itself could not be recorded.
    pub(super) fn act_job_failed(&mut self, job: &mut GmJob) -> Result<Next, StorageError> {
        tracing::error!(job_id = %job.id, state = %job.state, failure = %job.failure(), "job failure detected");
        self.release_child(job);
        let state = job.state;
        self.remember_failed_state(job, state, "internal");
        self.failed_job(job, false)?;
        match job.state {
            JobState::Finished | JobState::Deleted => return Ok(Next::Drop),
            JobState::Finishing => job.state = JobState::Finished,
            _ => job.state = JobState::Finishing,
        }
        job.pending = false;
        Ok(Next::Reprocess)
    }

    /// Record the state the job failed in, unless one is already recorded.
    fn remember_failed_state(&self, job: &mut GmJob, state: JobState, cause: &str) {
        if state == JobState::Undefined || state.is_terminal() {
            return;
        }
        let Some(local) = job.local.as_mut() else { return };
        if local.failedstate.is_empty() {
            local.failedstate = state.as_str().to_string();
            local.failedcause = cause.to_string();
        }
    }

    /// Flush the failure reason and trim the output list to what must
    /// survive a failure.
    ///
    /// Outputs with a remote destination are kept for upload unless the job
    /// was cancelled. If the job may be rerun, user-uploaded inputs are kept
    /// too so a restart finds them.
    pub(super) fn failed_job(&self, job: &mut GmJob, cancel: bool) -> Result<(), StorageError> {
        let reason = job.take_failure();
        if !reason.is_empty() {
            self.store.append_failure(&job.id, &reason)?;
        }
        let Some(local) = job.local.as_mut() else {
            return Ok(());
        };
        local.uploads = 0;
        if job.state != JobState::Finishing {
            let mut outputs: Vec<FileData> = local
                .outputs
                .iter()
                .filter(|f| !cancel || !f.has_lfn())
                .cloned()
                .collect();
            if !cancel && local.reruns > 0 {
                outputs.extend(
                    local
                        .inputs
                        .iter()
                        .filter(|f| !f.lfn.contains(':'))
                        .map(|f| FileData::new(f.pfn.clone(), "")),
                );
            }
            local.uploads = outputs.iter().filter(|f| f.has_lfn()).count() as u32;
            self.store.write_list(&job.id, TransferList::Output, &outputs)?;
        }
        self.store.write_local(&job.id, local)
    }

    /// Force a job whose failure could not be processed straight to FINISHED.
    pub(super) fn internal_failure(&mut self, job: &mut GmJob, error: &StorageError) {
        tracing::error!(job_id = %job.id, state = %job.state, error = %error, "failed processing job failure");
        self.release_child(job);
        job.state = JobState::Finished;
        job.pending = false;
        if let Err(e) = self.store.write_status(&job.id, StatusRecord::new(job.state, false)) {
            tracing::error!(job_id = %job.id, error = %e, "failed writing status of troubled job");
        }
        job.add_failure(INTERNAL_FAILURE);
        if let Err(e) = self.failed_job(job, false) {
            tracing::error!(job_id = %job.id, error = %e, "failed recording failure of troubled job");
        }
        if let Err(e) = self.store.clean_finished(&job.id) {
            tracing::warn!(job_id = %job.id, error = %e, "failed cleaning troubled job");
        }
    }

    pub(super) fn cancel_requested(&self, job: &GmJob) -> bool {
        matches!(
            job.state,
            JobState::Accepted
                | JobState::Preparing
                | JobState::Submitting
                | JobState::InLrms
                | JobState::Finishing
        ) && self.store.has_mark(&job.id, Mark::Cancel)
    }

    /// Honour a cancel mark.
    ///
    /// Jobs known to the LRMS go to CANCELING, a cancelled upload ends the job
    /// and everything else moves to FINISHING. The mark is cleared once
    /// handled.
    pub(super) fn cancel_job(&mut self, job: &mut GmJob) -> HandlerResult {
        tracing::info!(job_id = %job.id, state = %job.state, "canceling job on user request");
        self.release_child(job);
        job.add_failure(CANCEL_REASON);
        let state = job.state;
        self.remember_failed_state(job, state, "client");
        if let Err(e) = self.failed_job(job, true) {
            tracing::error!(job_id = %job.id, error = %e, "failed recording cancellation");
        }
        let in_lrms = match job.state {
            JobState::InLrms => true,
            JobState::Submitting => match self.store.grami_local_id(&job.id) {
                Some(localid) => {
                    if let Some(local) = job.local.as_mut() {
                        local.localid = localid;
                        self.store.write_local(&job.id, local)?;
                    }
                    true
                }
                None => false,
            },
            _ => false,
        };
        job.state = if in_lrms {
            JobState::Canceling
        } else if job.state == JobState::Finishing {
            JobState::Finished
        } else {
            JobState::Finishing
        };
        job.pending = false;
        if let Err(e) = self.store.clear_mark(&job.id, Mark::Cancel) {
            tracing::warn!(job_id = %job.id, error = %e, "failed clearing cancel mark");
        }
        Ok(Next::Reprocess)
    }
}
