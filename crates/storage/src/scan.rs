// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory scans used for recovery and periodic discovery.
//!
//! Files may appear or disappear while a scan runs; anything that vanishes or
//! fails the ownership check is skipped, never reported as an error.

use crate::error::StorageError;
use crate::layout::{self, Bucket, Mark, STATUS_SUFFIX};
use crate::store::ControlStore;
use arex_core::{JobId, Owner};
use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Which file owners a scan accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerPolicy {
    /// Never root-owned files. A non-root service accepts only its own files.
    Service { service_uid: u32 },
    /// Any regular file.
    AnyOwner,
}

impl OwnerPolicy {
    /// Policy for the uid this process runs as.
    pub fn service() -> Self {
        OwnerPolicy::Service { service_uid: nix::unistd::getuid().as_raw() }
    }

    pub fn accepts(self, uid: u32) -> bool {
        match self {
            OwnerPolicy::AnyOwner => true,
            OwnerPolicy::Service { .. } if uid == 0 => false,
            OwnerPolicy::Service { service_uid: 0 } => true,
            OwnerPolicy::Service { service_uid } => uid == service_uid,
        }
    }
}

/// A job discovered on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEntry {
    pub id: JobId,
    pub owner: Owner,
    /// Status file modification time, epoch seconds. Orders recovery oldest
    /// first and survives the move between buckets.
    pub discovered: u64,
}

impl ControlStore {
    /// Owner and modification time of a regular file acceptable under the policy.
    pub fn check_owner(&self, path: &Path) -> Option<(Owner, u64)> {
        let meta = fs::symlink_metadata(path).ok()?;
        if !meta.file_type().is_file() || !self.policy().accepts(meta.uid()) {
            return None;
        }
        let mtime = u64::try_from(meta.mtime()).unwrap_or(0);
        Some((Owner::new(meta.uid(), meta.gid()), mtime))
    }

    /// Jobs whose status file is in `bucket`, oldest first.
    pub fn scan_bucket(&self, bucket: Bucket) -> Result<Vec<JobEntry>, StorageError> {
        let dir = layout::bucket_dir(self.root(), bucket);
        let mut jobs: Vec<JobEntry> = self
            .list_dir(&dir)?
            .into_iter()
            .filter(|(_, suffix, _)| suffix == STATUS_SUFFIX)
            .filter_map(|(id, _, path)| {
                let (owner, discovered) = self.check_owner(&path)?;
                Some(JobEntry { id, owner, discovered })
            })
            .collect();
        jobs.sort_by(|a, b| a.discovered.cmp(&b.discovered).then_with(|| a.id.cmp(&b.id)));
        Ok(jobs)
    }

    /// Marks of the given kinds found in the `accepting` bucket.
    pub fn scan_marks(&self, kinds: &[Mark]) -> Result<Vec<(JobEntry, Mark)>, StorageError> {
        let dir = layout::bucket_dir(self.root(), Bucket::Accepting);
        let mut found: Vec<(JobEntry, Mark)> = self
            .list_dir(&dir)?
            .into_iter()
            .filter_map(|(id, suffix, path)| {
                let mark = Mark::from_name(&suffix).filter(|m| kinds.contains(m))?;
                let (owner, discovered) = self.check_owner(&path)?;
                Some((JobEntry { id, owner, discovered }, mark))
            })
            .collect();
        found.sort_by(|a, b| a.0.discovered.cmp(&b.0.discovered).then_with(|| a.0.id.cmp(&b.0.id)));
        Ok(found)
    }

    /// Entry for a single job from its status file, wherever it lives.
    pub fn job_entry(&self, id: &JobId) -> Option<JobEntry> {
        let bucket = self.status_bucket(id)?;
        let (owner, discovered) = self.check_owner(&self.status_path(bucket, id))?;
        Some(JobEntry { id: id.clone(), owner, discovered })
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<(JobId, String, PathBuf)>, StorageError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(dir, e)),
        };
        Ok(entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name();
                let (id, suffix) = layout::parse_file_name(name.to_str()?)?;
                Some((id, suffix.to_string(), entry.path()))
            })
            .collect())
    }
}

/// Incremental walk over the `finished` bucket.
///
/// Holds the open directory between passes so each pass resumes where the
/// previous one stopped.
pub struct FinishedCursor {
    entries: fs::ReadDir,
}

/// Jobs read in one step of a [`FinishedCursor`].
#[derive(Debug, Default)]
pub struct FinishedBatch {
    pub entries: Vec<JobEntry>,
    /// The directory has been fully walked; the cursor should be dropped.
    pub exhausted: bool,
}

impl FinishedCursor {
    pub fn open(store: &ControlStore) -> Result<Self, StorageError> {
        let dir = layout::bucket_dir(store.root(), Bucket::Finished);
        let entries = fs::read_dir(&dir).map_err(|e| StorageError::io(&dir, e))?;
        Ok(Self { entries })
    }

    /// Read up to `max_jobs` status entries or until `budget` elapses.
    /// A `max_jobs` of zero is read as one so the walk still advances.
    pub fn next_batch(
        &mut self,
        store: &ControlStore,
        max_jobs: u32,
        budget: Duration,
    ) -> FinishedBatch {
        let started = Instant::now();
        let mut batch = FinishedBatch::default();
        let max_jobs = max_jobs.max(1) as usize;
        while batch.entries.len() < max_jobs {
            if started.elapsed() >= budget {
                return batch;
            }
            let Some(entry) = self.entries.next() else {
                batch.exhausted = true;
                return batch;
            };
            let Ok(entry) = entry else { continue };
            let name = entry.file_name();
            let Some((id, suffix)) = name.to_str().and_then(layout::parse_file_name) else {
                continue;
            };
            if suffix != STATUS_SUFFIX {
                continue;
            }
            if let Some((owner, discovered)) = store.check_owner(&entry.path()) {
                batch.entries.push(JobEntry { id, owner, discovered });
            }
        }
        batch
    }
}

#[cfg(test)]
#[path = "scan_tests.rs"]
mod tests;
