// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! UNDEFINED and ACCEPTED: loading a job and admitting it to staging

use super::Engine;
use crate::error::{HandlerResult, JobFailure, Next};
use arex_adapters::Direction;
use arex_core::{Clock, GmJob, JobState, LocalDescription};
use arex_storage::Bucket;

impl<C: Clock> Engine<C> {
    /// Load a newly discovered job from its control files.
    ///
    /// Terminal jobs carry straight on to their handler. Everything else waits
    /// for the next pass so it shows up in that pass's counters and demand.
    pub(super) fn state_undefined(&mut self, job: &mut GmJob) -> HandlerResult {
        if !self.config.max_jobs.allows(self.counters.tracked()) {
            tracing::debug!(job_id = %job.id, "job limit reached, leaving job for later");
            return Ok(Next::Drop);
        }
        let record = match self.store.read_status(&job.id) {
            Ok(record) if record.state != JobState::Undefined => record,
            Err(e) if e.is_not_found() => {
                tracing::debug!(job_id = %job.id, "status file is gone");
                return Ok(Next::Drop);
            }
            Ok(_) => return Err(JobFailure::new("Failed reading status of the job")),
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "reading status of new job failed");
                return Err(JobFailure::new("Failed reading status of the job"));
            }
        };
        let local = match self.store.read_local(&job.id) {
            Ok(local) => local,
            Err(e) if record.state.is_terminal() => {
                tracing::warn!(job_id = %job.id, error = %e, "no local description for terminal job");
                LocalDescription::default()
            }
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "reading local description failed");
                return Err(JobFailure::new("Failed reading local job information"));
            }
        };

        job.transfer_share = local.transfershare.clone();
        job.session_dir = Some(
            local
                .sessiondir
                .clone()
                .unwrap_or_else(|| self.config.session_root().join(job.id.as_str())),
        );
        job.keep_finished = self.config.keep_finished;
        job.keep_deleted = self.config.keep_deleted;
        job.retries = self.config.max_retries;
        job.local = Some(local);
        job.state = record.state;
        job.pending = record.pending;

        // Jobs recovered from `restarting` move back to their own bucket
        if self.store.status_bucket(&job.id) != Some(Bucket::for_state(record.state)) {
            self.store.write_status(&job.id, record)?;
        }
        tracing::info!(job_id = %job.id, state = %job.state, pending = job.pending, "job loaded");

        match job.state {
            JobState::Finished | JobState::Deleted => Ok(Next::Reprocess),
            JobState::Accepted => Ok(Next::Wait),
            _ => {
                job.start(self.now());
                Ok(Next::Wait)
            }
        }
    }

    pub(super) fn state_accepted(&mut self, job: &mut GmJob) -> HandlerResult {
        let Some(local) = job.local.as_ref() else {
            return Err(JobFailure::new("Failed reading local job information"));
        };
        if local.dryrun {
            tracing::info!(job_id = %job.id, "dry run requested, skipping job");
            return Err(JobFailure::new("Job has dryrun requested. Job skipped."));
        }
        let processtime = local.processtime;

        if !self.config.max_jobs_per_dn.allows(self.counters.per_dn(job.subject())) {
            self.set_pending(job, "Jobs per DN limit is reached");
            return Ok(Next::Wait);
        }
        let now = self.now();
        if let Some(at) = processtime.filter(|at| *at > now) {
            tracing::debug!(job_id = %job.id, process_time = at, "waiting for requested start time");
            return Ok(Next::Wait);
        }
        if job.next_retry.is_some_and(|at| at > now) {
            return Ok(Next::Wait);
        }
        if !self.admit_staging(job, Direction::Download) {
            self.set_pending(job, "Limit of PREPARING jobs is reached");
            return Ok(Next::Wait);
        }

        tracing::info!(job_id = %job.id, "moving to PREPARING");
        job.state = JobState::Preparing;
        job.pending = false;
        job.start(now);
        Ok(Next::Reprocess)
    }
}
