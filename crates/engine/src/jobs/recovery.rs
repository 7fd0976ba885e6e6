// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discovering jobs: startup recovery, new submissions, marks and the
//! incremental sweep of the finished bucket.

use super::JobsList;
use arex_core::{Clock, JobId, JobState};
use arex_storage::{Bucket, FinishedCursor, Mark, StorageError};
use std::time::Duration;

impl<C: Clock> JobsList<C> {
    /// Move jobs interrupted mid-flight into `restarting`. Run once at
    /// startup, before the first scan.
    pub fn restart_jobs(&mut self) -> Result<usize, StorageError> {
        let moved = self.engine.store.move_bucket(Bucket::Processing, Bucket::Restarting)?;
        if moved > 0 {
            tracing::info!(moved, "jobs queued for recovery");
        }
        Ok(moved)
    }

    /// Load jobs from `restarting` then `accepting`, oldest first.
    pub fn scan_new_jobs(&mut self) -> Result<usize, StorageError> {
        let mut loaded = self
            .jobs
            .values()
            .filter(|j| j.state == JobState::Undefined || j.state.is_tracked())
            .count() as u32;
        let mut added = 0;
        for bucket in [Bucket::Restarting, Bucket::Accepting] {
            for entry in self.engine.store.scan_bucket(bucket)? {
                if !self.engine.config.max_jobs.allows(loaded) {
                    tracing::debug!(added, "job limit reached, stopping scan");
                    return Ok(added);
                }
                if self.add_job(entry.id, entry.owner) {
                    loaded += 1;
                    added += 1;
                }
            }
        }
        if added > 0 {
            tracing::info!(added, "new jobs found");
        }
        Ok(added)
    }

    /// Pick up cancel, clean and restart marks for jobs not in memory.
    ///
    /// Marks for jobs that are gone are removed. Finished jobs are loaded for
    /// one pass so the mark is honoured.
    pub fn scan_new_marks(&mut self) -> Result<usize, StorageError> {
        let mut added = 0;
        for (entry, mark) in self.engine.store.scan_marks(&Mark::ALL)? {
            if self.jobs.contains_key(&entry.id) {
                continue;
            }
            match self.engine.store.read_status(&entry.id) {
                Ok(record) if record.state == JobState::Finished => {
                    if self.add_job(entry.id, entry.owner) {
                        added += 1;
                    }
                }
                Ok(record) if record.state != JobState::Deleted && record.state != JobState::Undefined => {
                    // Active job not loaded yet; the mark waits for it
                }
                Ok(_) => self.drop_marks(&entry.id, mark),
                Err(e) if e.is_not_found() => self.drop_marks(&entry.id, mark),
                Err(e) => {
                    tracing::warn!(job_id = %entry.id, mark = %mark, error = %e, "failed reading status for mark");
                }
            }
        }
        Ok(added)
    }

    fn drop_marks(&self, id: &JobId, mark: Mark) {
        tracing::info!(job_id = %id, mark = %mark, "removing mark of vanished job");
        if let Err(e) = self.engine.store.clear_marks(id) {
            tracing::warn!(job_id = %id, error = %e, "failed removing marks");
        }
    }

    /// Continue the incremental walk over the `finished` bucket.
    ///
    /// Each call reads at most one budgeted batch. After a full walk the next
    /// one starts no sooner than `finished_scan.period` seconds later.
    pub fn scan_old_jobs(&mut self) -> Result<usize, StorageError> {
        let now = self.engine.clock.epoch_secs();
        let scan = self.engine.config.finished_scan.clone();
        if self.finished_cursor.is_none() {
            if now < self.next_finished_sweep {
                return Ok(0);
            }
            self.finished_cursor = Some(FinishedCursor::open(&self.engine.store)?);
        }
        let Some(cursor) = self.finished_cursor.as_mut() else {
            return Ok(0);
        };
        let batch = cursor.next_batch(
            &self.engine.store,
            scan.max_jobs,
            Duration::from_millis(scan.max_time_ms),
        );
        if batch.exhausted {
            self.finished_cursor = None;
            self.next_finished_sweep = now.saturating_add(scan.period);
        }
        let mut added = 0;
        for entry in batch.entries {
            if self.add_job(entry.id, entry.owner) {
                added += 1;
            }
        }
        if added > 0 {
            tracing::debug!(added, "finished jobs loaded");
        }
        Ok(added)
    }

    /// One full iteration: discover work, then act on every job.
    pub fn tick(&mut self) -> crate::PassSummary {
        if let Err(e) = self.scan_new_marks() {
            tracing::warn!(error = %e, "mark scan failed");
        }
        if let Err(e) = self.scan_new_jobs() {
            tracing::warn!(error = %e, "new job scan failed");
        }
        if let Err(e) = self.scan_old_jobs() {
            tracing::warn!(error = %e, "finished job scan failed");
        }
        self.act_jobs()
    }
}
