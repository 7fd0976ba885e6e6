// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Removal of control files as a job winds down.
//!
//! Each level removes a superset of the previous one:
//! finished → deleted → final.

use crate::error::StorageError;
use crate::layout::{Bucket, ControlFile, Mark};
use crate::store::{remove_if_exists, ControlStore};
use arex_core::JobId;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Transient files no longer needed once a job is FINISHED.
const FINISHED_FILES: [ControlFile; 3] =
    [ControlFile::LrmsDone, ControlFile::Grami, ControlFile::InputStatus];

/// Files removed when a job is DELETED. Status, local description, failure
/// reason, errors log and diagnostics stay for inspection.
const DELETED_FILES: [ControlFile; 5] = [
    ControlFile::Input,
    ControlFile::Output,
    ControlFile::OutputStatus,
    ControlFile::Proxy,
    ControlFile::Description,
];

impl ControlStore {
    pub fn clean_finished(&self, id: &JobId) -> Result<(), StorageError> {
        for file in FINISHED_FILES {
            self.remove_control(id, file)?;
        }
        self.clear_mark(id, Mark::Cancel)
    }

    /// Drop the session directory, transfer lists and cache links.
    pub fn clean_deleted(
        &self,
        id: &JobId,
        session_dir: Option<&Path>,
        cache_dirs: &[PathBuf],
    ) -> Result<(), StorageError> {
        self.clean_finished(id)?;
        for file in DELETED_FILES {
            self.remove_control(id, file)?;
        }
        if let Some(dir) = session_dir {
            remove_dir_if_exists(dir)?;
        }
        for cache in cache_dirs {
            remove_dir_if_exists(&cache.join("joblinks").join(id.as_str()))?;
        }
        Ok(())
    }

    /// Remove every trace of the job.
    pub fn clean_final(
        &self,
        id: &JobId,
        session_dir: Option<&Path>,
        cache_dirs: &[PathBuf],
    ) -> Result<(), StorageError> {
        self.clean_deleted(id, session_dir, cache_dirs)?;
        if let Some(dir) = session_dir {
            let mut diag = dir.as_os_str().to_owned();
            diag.push(".diag");
            remove_if_exists(Path::new(&diag))?;
        }
        for file in ControlFile::ALL {
            self.remove_control(id, file)?;
        }
        self.clear_marks(id)?;
        for bucket in Bucket::ALL {
            remove_if_exists(&self.status_path(bucket, id))?;
        }
        Ok(())
    }
}

fn remove_dir_if_exists(dir: &Path) -> Result<(), StorageError> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StorageError::io(dir, e)),
    }
}

#[cfg(test)]
#[path = "cleanup_tests.rs"]
mod tests;
