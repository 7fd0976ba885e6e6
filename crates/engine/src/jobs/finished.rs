// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! FINISHED and DELETED: retention, cleanup and restart replay

use super::Engine;
use crate::error::{HandlerResult, JobFailure, Next};
use arex_core::{Clock, FileData, GmJob, JobState};
use arex_storage::{Mark, StorageError, TransferList};

impl<C: Clock> Engine<C> {
    /// Honour clean and restart marks, then age the job toward DELETED.
    ///
    /// FINISHED jobs are not kept in memory: unless restarted, the job is
    /// dropped after this pass and picked up again by the finished sweep.
    pub(super) fn state_finished(&mut self, job: &mut GmJob) -> HandlerResult {
        // Nothing left to cancel
        if self.store.has_mark(&job.id, Mark::Cancel) {
            if let Err(e) = self.store.clear_mark(&job.id, Mark::Cancel) {
                tracing::warn!(job_id = %job.id, error = %e, "failed clearing cancel mark");
            }
        }
        if self.store.has_mark(&job.id, Mark::Clean) {
            tracing::info!(job_id = %job.id, "cleaning job on request");
            self.purge(job);
            return Ok(Next::Drop);
        }
        if self.store.has_mark(&job.id, Mark::Restart) {
            if let Err(e) = self.store.clear_mark(&job.id, Mark::Restart) {
                tracing::warn!(job_id = %job.id, error = %e, "failed clearing restart mark");
            }
            if self.restart_job(job)? {
                return Ok(Next::Reprocess);
            }
        }

        let Some(cleanup_at) = self.cleanup_time(job) else {
            return Ok(Next::Drop);
        };
        if self.now() < cleanup_at {
            return Ok(Next::Drop);
        }
        if job.keep_deleted == 0 {
            tracing::info!(job_id = %job.id, "retention expired, removing job");
            self.purge(job);
            return Ok(Next::Drop);
        }
        tracing::info!(job_id = %job.id, "retention expired, moving to DELETED");
        let session_dir = self.session_dir(job);
        if let Err(e) =
            self.store.clean_deleted(&job.id, Some(&session_dir), &self.config.cache_dirs)
        {
            tracing::warn!(job_id = %job.id, error = %e, "failed cleaning deleted job");
        }
        job.state = JobState::Deleted;
        job.pending = false;
        Ok(Next::Wait)
    }

    /// Purge once `keep_deleted` has passed since the cleanup time.
    pub(super) fn state_deleted(&mut self, job: &mut GmJob) -> HandlerResult {
        let cleanup_at = job.local.as_ref().and_then(|l| l.cleanuptime);
        let expired = cleanup_at.map_or(true, |at| self.now() >= at.saturating_add(job.keep_deleted));
        if expired {
            tracing::info!(job_id = %job.id, "removing deleted job");
            self.purge(job);
        }
        Ok(Next::Drop)
    }

    /// When the FINISHED job's files are due for removal.
    ///
    /// Computed once from the status file time and the job's lifetime, then
    /// kept in the local description so later passes agree.
    fn cleanup_time(&self, job: &mut GmJob) -> Option<u64> {
        if let Some(at) = job.local.as_ref().and_then(|l| l.cleanuptime) {
            return Some(at);
        }
        let finished_at = match self.store.status_mtime(&job.id) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "no status time for finished job");
                return None;
            }
        };
        let keep = job.keep_finished;
        let local = job.local.as_mut()?;
        let lifetime = local.lifetime.map_or(keep, |l| l.min(keep));
        let at = finished_at.saturating_add(lifetime);
        local.cleanuptime = Some(at);
        if let Err(e) = self.store.write_local(&job.id, local) {
            tracing::warn!(job_id = %job.id, error = %e, "failed storing cleanup time");
        }
        Some(at)
    }

    fn purge(&self, job: &GmJob) {
        let session_dir = self.session_dir(job);
        if let Err(e) = self.store.clean_final(&job.id, Some(&session_dir), &self.config.cache_dirs) {
            tracing::warn!(job_id = %job.id, error = %e, "failed removing job files");
        }
    }

    /// Replay a failed job from the phase it failed in.
    ///
    /// Returns false when the job cannot be restarted: no reruns left, or it
    /// did not fail in a replayable state.
    fn restart_job(&mut self, job: &mut GmJob) -> Result<bool, JobFailure> {
        let Some(local) = job.local.as_mut() else {
            return Ok(false);
        };
        if local.reruns == 0 {
            tracing::warn!(job_id = %job.id, "restart requested but no reruns left");
            self.store.append_errors(&job.id, job.state, "Restart requested but no reruns left");
            return Ok(false);
        }
        let resume = JobState::from_name(&local.failedstate).and_then(|failed| match failed {
            JobState::Preparing => Some(JobState::Accepted),
            JobState::Submitting | JobState::InLrms if local.downloads > 0 => Some(JobState::Accepted),
            JobState::Submitting | JobState::InLrms => Some(JobState::Preparing),
            JobState::Finishing => Some(JobState::InLrms),
            _ => None,
        });
        let Some(resume) = resume else {
            tracing::warn!(job_id = %job.id, failed_state = %local.failedstate, "restart requested but job did not fail in a restartable state");
            self.store.append_errors(&job.id, job.state, "Restart requested but job can not be restarted");
            return Ok(false);
        };
        local.reruns -= 1;
        local.failedstate.clear();
        local.failedcause.clear();
        local.cleanuptime = None;

        self.recreate_transfer_lists(job)?;
        self.store.clear_failure(&job.id)?;
        job.retries = self.config.max_retries;
        job.next_retry = None;
        job.state = resume;
        job.pending = true;
        tracing::info!(job_id = %job.id, resume = %resume, "restarting job");
        Ok(true)
    }

    /// Rebuild the transfer lists from the job's original lists, skipping
    /// what was already transferred.
    fn recreate_transfer_lists(&self, job: &mut GmJob) -> Result<(), StorageError> {
        let session_dir = self.session_dir(job);
        let uploaded = self.store.read_transferred(&job.id, TransferList::Output);
        let Some(local) = job.local.as_mut() else {
            return Ok(());
        };
        let outputs: Vec<FileData> = local
            .outputs
            .iter()
            .filter(|f| !uploaded.iter().any(|done| *done == f.pfn || *done == f.lfn))
            .cloned()
            .collect();
        let inputs: Vec<FileData> = local
            .inputs
            .iter()
            .filter(|f| !session_dir.join(f.pfn.trim_start_matches('/')).exists())
            .cloned()
            .collect();
        local.uploads = outputs.iter().filter(|f| f.has_lfn()).count() as u32;
        local.downloads = inputs.iter().filter(|f| f.has_lfn()).count() as u32;
        self.store.write_list(&job.id, TransferList::Output, &outputs)?;
        self.store.write_list(&job.id, TransferList::Input, &inputs)?;
        self.store.write_local(&job.id, local)
    }
}
