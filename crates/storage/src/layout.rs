// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk naming of control files.
//!
//! ```text
//! <control>/<bucket>/job.<id>.status       one per job, bucket = phase
//! <control>/accepting/job.<id>.<mark>      cancel | clean | restart
//! <control>/job.<id>.<suffix>              local, failed, errors, ...
//! <control>/logs/                          accounting records
//! ```

use arex_core::{JobId, JobState};
use std::path::{Path, PathBuf};

pub const JOB_PREFIX: &str = "job.";
pub const STATUS_SUFFIX: &str = "status";
pub const LOGS_DIR: &str = "logs";

/// Phase directory holding a job's status file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Accepting,
    Processing,
    Finished,
    Restarting,
}

arex_core::named_enum! {
    Bucket {
        Accepting => "accepting",
        Processing => "processing",
        Finished => "finished",
        Restarting => "restarting",
    }
}

impl Bucket {
    pub const ALL: [Bucket; 4] =
        [Bucket::Processing, Bucket::Accepting, Bucket::Restarting, Bucket::Finished];

    /// Where a status file for `state` lives.
    pub fn for_state(state: JobState) -> Bucket {
        match state {
            JobState::Accepted => Bucket::Accepting,
            JobState::Finished | JobState::Deleted => Bucket::Finished,
            _ => Bucket::Processing,
        }
    }
}

/// Out-of-band request placed by an administrator or client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mark {
    Cancel,
    Clean,
    Restart,
}

arex_core::named_enum! {
    Mark {
        Cancel => "cancel",
        Clean => "clean",
        Restart => "restart",
    }
}

impl Mark {
    pub const ALL: [Mark; 3] = [Mark::Cancel, Mark::Clean, Mark::Restart];
}

/// Per-job control file kinds stored at the control-dir root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlFile {
    Local,
    Failed,
    Errors,
    Diag,
    Input,
    Output,
    InputStatus,
    OutputStatus,
    LrmsDone,
    Grami,
    Description,
    Proxy,
}

arex_core::named_enum! {
    ControlFile {
        Local => "local",
        Failed => "failed",
        Errors => "errors",
        Diag => "diag",
        Input => "input",
        Output => "output",
        InputStatus => "input_status",
        OutputStatus => "output_status",
        LrmsDone => "lrms_done",
        Grami => "grami",
        Description => "description",
        Proxy => "proxy",
    }
}

impl ControlFile {
    pub const ALL: [ControlFile; 12] = [
        ControlFile::Local,
        ControlFile::Failed,
        ControlFile::Errors,
        ControlFile::Diag,
        ControlFile::Input,
        ControlFile::Output,
        ControlFile::InputStatus,
        ControlFile::OutputStatus,
        ControlFile::LrmsDone,
        ControlFile::Grami,
        ControlFile::Description,
        ControlFile::Proxy,
    ];
}

/// `job.<id>.<suffix>`
pub fn file_name(id: &JobId, suffix: &str) -> String {
    format!("{JOB_PREFIX}{id}.{suffix}")
}

/// Split `job.<id>.<suffix>` into id and suffix. The id may contain dots.
pub fn parse_file_name(name: &str) -> Option<(JobId, &str)> {
    let rest = name.strip_prefix(JOB_PREFIX)?;
    let (id, suffix) = rest.rsplit_once('.')?;
    if !arex_core::is_valid_job_id(id) {
        return None;
    }
    Some((JobId::new(id), suffix))
}

pub fn bucket_dir(root: &Path, bucket: Bucket) -> PathBuf {
    root.join(bucket.as_str())
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
