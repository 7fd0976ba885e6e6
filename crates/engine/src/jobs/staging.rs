// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PREPARING and FINISHING: data staging through the transfer helpers

use super::{Engine, HelperPoll};
use crate::admission::{AdmissionPolicy, Allocation, ShareDemand};
use crate::backoff;
use crate::error::{HandlerResult, JobFailure, Next};
use arex_adapters::{Direction, StageRequest, TransferExit};
use arex_core::{ChildHandle, Clock, FileData, GmJob, JobId, JobState};
use arex_storage::{ControlFile, TransferList};
use indexmap::IndexMap;
use std::collections::BTreeMap;

impl<C: Clock> Engine<C> {
    pub(super) fn state_preparing(&mut self, job: &mut GmJob) -> HandlerResult {
        match self.poll_helper(job) {
            HelperPoll::Idle => {
                if !self.store.read_list(&job.id, TransferList::Input)?.is_empty() {
                    return self.start_staging(job, Direction::Download);
                }
                let free_stagein = job.local.as_ref().is_some_and(|l| l.freestagein);
                if free_stagein && !self.store.stagein_confirmed(&job.id) {
                    // Client is still pushing input files
                    return Ok(Next::Wait);
                }
            }
            HelperPoll::Running | HelperPoll::Suspicious => return Ok(Next::Wait),
            HelperPoll::TimedOut => return Err(JobFailure::new("Data download timed out")),
            HelperPoll::Exited(code) => {
                self.release_child(job);
                match TransferExit::from_code(code) {
                    TransferExit::Done => {
                        job.next_retry = None;
                        self.store.write_list(&job.id, TransferList::Input, &[])?;
                    }
                    TransferExit::Retry => return self.retry(job, Direction::Download),
                    TransferExit::Failed(code) => {
                        tracing::error!(job_id = %job.id, code, "downloader failed");
                        return Err(JobFailure::new("Data download failed"));
                    }
                }
            }
        }

        if !job.has_executable() {
            tracing::info!(job_id = %job.id, "no executable, staging only");
            job.state = JobState::Finishing;
            job.pending = false;
            return Ok(Next::Reprocess);
        }
        if !self.config.max_jobs_running.allows(self.counters.running()) {
            self.set_pending(job, "Limit of RUNNING jobs is reached");
            return Ok(Next::Wait);
        }
        job.state = JobState::Submitting;
        job.pending = false;
        Ok(Next::Reprocess)
    }

    pub(super) fn state_finishing(&mut self, job: &mut GmJob) -> HandlerResult {
        match self.poll_helper(job) {
            HelperPoll::Idle => {
                let outputs = self.store.read_list(&job.id, TransferList::Output)?;
                if outputs.iter().any(FileData::has_lfn) {
                    return self.start_staging(job, Direction::Upload);
                }
            }
            HelperPoll::Running | HelperPoll::Suspicious => return Ok(Next::Wait),
            HelperPoll::TimedOut => return Err(JobFailure::new("Data upload timed out")),
            HelperPoll::Exited(code) => {
                self.release_child(job);
                match TransferExit::from_code(code) {
                    TransferExit::Done => {
                        job.next_retry = None;
                        let kept: Vec<FileData> = self
                            .store
                            .read_list(&job.id, TransferList::Output)?
                            .into_iter()
                            .filter(|f| !f.has_lfn())
                            .collect();
                        self.store.write_list(&job.id, TransferList::Output, &kept)?;
                    }
                    TransferExit::Retry => return self.retry(job, Direction::Upload),
                    TransferExit::Failed(code) => {
                        tracing::error!(job_id = %job.id, code, "uploader failed");
                        return Err(JobFailure::new("Data upload failed"));
                    }
                }
            }
        }

        tracing::info!(job_id = %job.id, "stage-out finished");
        job.state = JobState::Finished;
        job.pending = false;
        Ok(Next::Reprocess)
    }

    fn start_staging(&mut self, job: &mut GmJob, direction: Direction) -> HandlerResult {
        let session_dir = self.session_dir(job);
        let errors_log = self.store.control_path(&job.id, ControlFile::Errors);
        let req = StageRequest {
            id: &job.id,
            direction,
            owner: job.owner,
            share: &job.transfer_share,
            control_dir: self.store.root(),
            session_dir: &session_dir,
            errors_log: &errors_log,
        };
        match self.deps.stager.start(&req) {
            Ok(process) => {
                tracing::info!(job_id = %job.id, direction = %direction, "transfer helper started");
                job.child = Some(ChildHandle::new(process, self.clock.now()));
                Ok(Next::Wait)
            }
            Err(e) => {
                tracing::error!(job_id = %job.id, direction = %direction, error = %e, "failed to start transfer helper");
                Err(JobFailure::new(match direction {
                    Direction::Download => "Failed to run downloader",
                    Direction::Upload => "Failed to run uploader",
                }))
            }
        }
    }

    /// Back off after a retryable transfer failure, stepping back one state.
    fn retry(&mut self, job: &mut GmJob, direction: Direction) -> HandlerResult {
        if job.retries == 0 {
            return Err(JobFailure::new(match direction {
                Direction::Download => "Data download failed. No retries left.",
                Direction::Upload => "Data upload failed. No retries left.",
            }));
        }
        job.retries -= 1;
        let attempt = backoff::attempt(self.config.max_retries, job.retries);
        let delay = backoff::retry_delay(self.config.retry_base_secs, attempt, &mut self.rng);
        job.next_retry = Some(self.now().saturating_add(delay));
        tracing::warn!(
            job_id = %job.id,
            direction = %direction,
            retries_left = job.retries,
            delay_secs = delay,
            "transfer failed, will retry"
        );
        match direction {
            Direction::Download => {
                job.state = JobState::Accepted;
                job.pending = false;
            }
            Direction::Upload => {
                job.state = JobState::InLrms;
                job.pending = true;
            }
        }
        Ok(Next::Wait)
    }

    /// True when the job may enter the staging state for `direction` now.
    pub(super) fn admit_staging(&self, job: &GmJob, direction: Direction) -> bool {
        let occupancy = self.counters.share_occupancy(direction, &job.transfer_share);
        self.config.max_jobs_staging.allows(self.counters.staging())
            && self.allocation.allows(direction, &job.transfer_share, occupancy)
    }

    /// Per-share allocation for this pass from what jobs hold and want.
    pub(super) fn compute_allocation(&self, jobs: &IndexMap<JobId, GmJob>) -> Allocation {
        let now = self.now();
        let mut demand: BTreeMap<String, ShareDemand> = BTreeMap::new();
        for job in jobs.values() {
            let ready = job.next_retry.map_or(true, |at| at <= now);
            let entry = demand.entry(job.transfer_share.clone()).or_default();
            match job.state {
                JobState::Preparing if !job.pending => entry.preparing += 1,
                JobState::Finishing if !job.pending => entry.finishing += 1,
                JobState::Accepted if ready && start_time_reached(job, now) => {
                    entry.want_preparing += 1;
                }
                JobState::InLrms if ready && (job.pending || self.store.has_lrms_done(&job.id)) => {
                    entry.want_finishing += 1;
                }
                _ => {}
            }
        }
        let policy = AdmissionPolicy {
            staging_cap: self.config.max_jobs_staging,
            per_share_max: self.config.max_jobs_per_share,
            privileged: &self.config.privileged_shares,
        };
        let allocation = Allocation::compute(policy, &demand, self.passes);
        if !allocation.is_unlimited() {
            tracing::debug!(slots = allocation.total(), shares = demand.len(), "staging allocation");
        }
        allocation
    }
}

fn start_time_reached(job: &GmJob, now: u64) -> bool {
    job.local.as_ref().and_then(|l| l.processtime).map_or(true, |at| at <= now)
}
