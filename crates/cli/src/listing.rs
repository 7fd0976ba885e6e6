// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only snapshot of the control dir.
//!
//! Reads the files directly; a running grid-manager may change them while
//! they are read, so a job can be missed or shown in a stale state.

use std::collections::BTreeMap;

use arex_core::{JobId, JobState};
use arex_storage::{Bucket, ControlStore, StorageError};
use serde::Serialize;

/// One job as found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRow {
    pub id: JobId,
    pub state: &'static str,
    pub pending: bool,
    pub bucket: &'static str,
    pub uid: u32,
    pub gid: u32,
    /// Owner DN, empty if the local description is unreadable.
    pub subject: String,
    pub share: String,
    pub lrms: String,
    pub localid: String,
    /// Status file mtime, epoch seconds.
    pub status_time: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StateTotal {
    pub jobs: usize,
    pub pending: usize,
}

/// Jobs actively staging per share.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShareCount {
    pub preparing: usize,
    pub finishing: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct Snapshot {
    pub jobs: Vec<JobRow>,
    /// Keyed by state name, in pipeline order when iterated via [`Snapshot::totals_in_order`].
    pub totals: BTreeMap<&'static str, StateTotal>,
    pub shares: BTreeMap<String, ShareCount>,
}

impl Snapshot {
    pub fn collect(store: &ControlStore) -> Result<Self, StorageError> {
        let mut snapshot = Snapshot::default();
        for bucket in Bucket::ALL {
            for entry in store.scan_bucket(bucket)? {
                // Gone or garbled between scan and read
                let Ok(status) = store.read_status(&entry.id) else { continue };
                let local = store.read_local(&entry.id).ok();
                let (subject, share, lrms, localid) = match local {
                    Some(l) => (l.subject, l.transfershare, l.lrms, l.localid),
                    None => Default::default(),
                };
                let row = JobRow {
                    status_time: store.status_mtime(&entry.id).unwrap_or(entry.discovered),
                    id: entry.id,
                    state: status.state.as_str(),
                    pending: status.pending,
                    bucket: bucket.as_str(),
                    uid: entry.owner.uid,
                    gid: entry.owner.gid,
                    subject,
                    share,
                    lrms,
                    localid,
                };
                snapshot.count(status.state, &row);
                snapshot.jobs.push(row);
            }
        }
        snapshot.jobs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(snapshot)
    }

    fn count(&mut self, state: JobState, row: &JobRow) {
        let total = self.totals.entry(state.as_str()).or_default();
        total.jobs += 1;
        if row.pending {
            total.pending += 1;
            return;
        }
        match state {
            JobState::Preparing => self.shares.entry(row.share.clone()).or_default().preparing += 1,
            JobState::Finishing => self.shares.entry(row.share.clone()).or_default().finishing += 1,
            _ => {}
        }
    }

    /// Non-empty totals ordered by pipeline position.
    pub fn totals_in_order(&self) -> Vec<(&'static str, StateTotal)> {
        JobState::ALL
            .iter()
            .filter_map(|s| self.totals.get(s.as_str()).map(|t| (s.as_str(), *t)))
            .collect()
    }
}

#[cfg(test)]
#[path = "listing_tests.rs"]
mod tests;
