// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-file store: one durable record per job.
//!
//! The status file is the single source of truth for a job's state after a
//! crash. Status and local-description writes go through a temporary file
//! and a rename so a concurrent reader never sees a partial record.

use crate::error::StorageError;
use crate::layout::{self, Bucket, ControlFile, Mark, STATUS_SUFFIX};
use crate::scan::OwnerPolicy;
use arex_core::{format_utc_now, FileData, JobId, JobState, LocalDescription, StatusRecord};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

/// Outcome reported by the LRMS scanner in `job.<id>.lrms_done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LrmsResult {
    pub code: i32,
    pub description: String,
}

impl LrmsResult {
    /// `<code> <description>`; empty content means exit code 0.
    pub fn parse(content: &str) -> Self {
        let line = content.lines().next().unwrap_or("").trim();
        if line.is_empty() {
            return Self { code: 0, description: String::new() };
        }
        let (first, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        match first.parse() {
            Ok(code) => Self { code, description: rest.trim().to_string() },
            Err(_) => Self { code: -1, description: line.to_string() },
        }
    }
}

/// Transfer lists consumed by the staging helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferList {
    Input,
    Output,
}

impl TransferList {
    fn file(self) -> ControlFile {
        match self {
            TransferList::Input => ControlFile::Input,
            TransferList::Output => ControlFile::Output,
        }
    }

    fn status_file(self) -> ControlFile {
        match self {
            TransferList::Input => ControlFile::InputStatus,
            TransferList::Output => ControlFile::OutputStatus,
        }
    }
}

/// Line in `input_status` confirming a client finished pushing input files.
pub const STAGEIN_DONE: &str = "/";

/// Key the submit helper writes the LRMS identifier under.
const GRAMI_JOBID: &str = "joboption_jobid=";

/// Filesystem-backed control-file store rooted at the control directory.
#[derive(Debug, Clone)]
pub struct ControlStore {
    root: PathBuf,
    policy: OwnerPolicy,
}

impl ControlStore {
    /// Store enforcing the service ownership policy on scans.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_policy(root, OwnerPolicy::service())
    }

    pub fn with_policy(root: impl Into<PathBuf>, policy: OwnerPolicy) -> Self {
        Self { root: root.into(), policy }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn policy(&self) -> OwnerPolicy {
        self.policy
    }

    /// Create the control dir, its buckets and the accounting log dir.
    pub fn ensure_layout(&self) -> Result<(), StorageError> {
        for bucket in Bucket::ALL {
            let dir = layout::bucket_dir(&self.root, bucket);
            fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        }
        let logs = self.logs_dir();
        fs::create_dir_all(&logs).map_err(|e| StorageError::io(&logs, e))
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join(layout::LOGS_DIR)
    }

    pub fn status_path(&self, bucket: Bucket, id: &JobId) -> PathBuf {
        layout::bucket_dir(&self.root, bucket).join(layout::file_name(id, STATUS_SUFFIX))
    }

    pub fn control_path(&self, id: &JobId, file: ControlFile) -> PathBuf {
        self.root.join(layout::file_name(id, file.as_str()))
    }

    pub fn mark_path(&self, id: &JobId, mark: Mark) -> PathBuf {
        layout::bucket_dir(&self.root, Bucket::Accepting).join(layout::file_name(id, mark.as_str()))
    }

    // ── status ──────────────────────────────────────────────────────────

    /// Bucket currently holding the job's status file.
    pub fn status_bucket(&self, id: &JobId) -> Option<Bucket> {
        Bucket::ALL.into_iter().find(|b| self.status_path(*b, id).is_file())
    }

    pub fn read_status(&self, id: &JobId) -> Result<StatusRecord, StorageError> {
        for bucket in Bucket::ALL {
            let path = self.status_path(bucket, id);
            match fs::read_to_string(&path) {
                Ok(content) => {
                    return StatusRecord::parse(&content)
                        .ok_or_else(|| StorageError::BadStatus { id: id.clone(), content });
                }
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::io(path, e)),
            }
        }
        Err(StorageError::NotFound(id.clone()))
    }

    /// Persist the status into the bucket matching its state and remove stale
    /// copies from the other buckets.
    pub fn write_status(&self, id: &JobId, record: StatusRecord) -> Result<(), StorageError> {
        let target = Bucket::for_state(record.state);
        let path = self.status_path(target, id);
        write_atomic(&path, record.to_string().as_bytes())?;
        for bucket in Bucket::ALL.into_iter().filter(|b| *b != target) {
            remove_if_exists(&self.status_path(bucket, id))?;
        }
        Ok(())
    }

    /// Modification time of the status file, in epoch seconds.
    pub fn status_mtime(&self, id: &JobId) -> Result<u64, StorageError> {
        let bucket = self.status_bucket(id).ok_or_else(|| StorageError::NotFound(id.clone()))?;
        let path = self.status_path(bucket, id);
        let meta = fs::metadata(&path).map_err(|e| StorageError::io(&path, e))?;
        Ok(u64::try_from(meta.mtime()).unwrap_or(0))
    }

    /// Move every status file from one bucket to another. Returns the count.
    pub fn move_bucket(&self, from: Bucket, to: Bucket) -> Result<usize, StorageError> {
        let src = layout::bucket_dir(&self.root, from);
        let entries = match fs::read_dir(&src) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StorageError::io(&src, e)),
        };
        let dst = layout::bucket_dir(&self.root, to);
        fs::create_dir_all(&dst).map_err(|e| StorageError::io(&dst, e))?;
        let mut moved = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !matches!(layout::parse_file_name(name), Some((_, STATUS_SUFFIX))) {
                continue;
            }
            match fs::rename(entry.path(), dst.join(name)) {
                Ok(()) => moved += 1,
                Err(e) => tracing::warn!(file = name, error = %e, "failed to move status file"),
            }
        }
        Ok(moved)
    }

    // ── local description ───────────────────────────────────────────────

    pub fn read_local(&self, id: &JobId) -> Result<LocalDescription, StorageError> {
        let path = self.control_path(id, ControlFile::Local);
        let content = fs::read_to_string(&path).map_err(|e| StorageError::io(&path, e))?;
        LocalDescription::parse(&content).map_err(|source| StorageError::Parse { path, source })
    }

    pub fn write_local(&self, id: &JobId, desc: &LocalDescription) -> Result<(), StorageError> {
        write_atomic(&self.control_path(id, ControlFile::Local), desc.render().as_bytes())
    }

    // ── marks ───────────────────────────────────────────────────────────

    /// Place a mark. Setting an existing mark again changes nothing.
    pub fn set_mark(&self, id: &JobId, mark: Mark) -> Result<(), StorageError> {
        let path = self.mark_path(id, mark);
        match OpenOptions::new().write(true).create(true).truncate(false).open(&path) {
            Ok(_) => Ok(()),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    pub fn has_mark(&self, id: &JobId, mark: Mark) -> bool {
        self.mark_path(id, mark).is_file()
    }

    pub fn clear_mark(&self, id: &JobId, mark: Mark) -> Result<(), StorageError> {
        remove_if_exists(&self.mark_path(id, mark))
    }

    pub fn clear_marks(&self, id: &JobId) -> Result<(), StorageError> {
        Mark::ALL.into_iter().try_for_each(|mark| self.clear_mark(id, mark))
    }

    // ── LRMS side channel ───────────────────────────────────────────────

    pub fn has_lrms_done(&self, id: &JobId) -> bool {
        self.control_path(id, ControlFile::LrmsDone).is_file()
    }

    /// Result left by the LRMS scanner, `None` while the job still runs.
    pub fn lrms_done(&self, id: &JobId) -> Option<LrmsResult> {
        match fs::read_to_string(self.control_path(id, ControlFile::LrmsDone)) {
            Ok(content) => Some(LrmsResult::parse(&content)),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(_) => Some(LrmsResult { code: -1, description: "Internal error".to_string() }),
        }
    }

    pub fn set_lrms_done(&self, id: &JobId, result: &LrmsResult) -> Result<(), StorageError> {
        let content = format!("{} {}", result.code, result.description);
        write_atomic(&self.control_path(id, ControlFile::LrmsDone), content.trim_end().as_bytes())
    }

    /// Write the job-requirements file handed to LRMS helpers.
    pub fn write_grami(
        &self,
        id: &JobId,
        desc: &LocalDescription,
        session_dir: &Path,
    ) -> Result<PathBuf, StorageError> {
        let mut content = format!("joboption_directory={}\n", session_dir.display());
        content.push_str(&format!("joboption_gridid={id}\n"));
        content.push_str(&format!("joboption_queue={}\n", desc.queue));
        content.push_str(&format!("joboption_jobname={}\n", desc.jobname));
        for (n, arg) in desc.args.iter().enumerate() {
            content.push_str(&format!("joboption_arg_{n}={}\n", arex_core::local::escape(arg)));
        }
        let path = self.control_path(id, ControlFile::Grami);
        write_atomic(&path, content.as_bytes())?;
        Ok(path)
    }

    /// LRMS identifier recorded by a successful submit helper.
    pub fn grami_local_id(&self, id: &JobId) -> Option<String> {
        let content = fs::read_to_string(self.control_path(id, ControlFile::Grami)).ok()?;
        content
            .lines()
            .filter_map(|l| l.strip_prefix(GRAMI_JOBID))
            .map(|v| v.trim().trim_matches('\'').to_string())
            .filter(|v| !v.is_empty())
            .last()
    }

    /// Move the diagnostics the job left next to its session dir into the
    /// control dir. Missing diagnostics are not an error.
    pub fn take_session_diag(&self, id: &JobId, session_dir: &Path) -> Result<(), StorageError> {
        let mut src = session_dir.as_os_str().to_owned();
        src.push(".diag");
        let src = PathBuf::from(src);
        let dst = self.control_path(id, ControlFile::Diag);
        match fs::rename(&src, &dst) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            // Different filesystem
            Err(_) => {
                fs::copy(&src, &dst).map_err(|e| StorageError::io(&dst, e))?;
                remove_if_exists(&src)
            }
        }
    }

    // ── failure record ──────────────────────────────────────────────────

    pub fn append_failure(&self, id: &JobId, reason: &str) -> Result<(), StorageError> {
        let path = self.control_path(id, ControlFile::Failed);
        append_line(&path, reason).map_err(|e| StorageError::io(path, e))
    }

    pub fn read_failure(&self, id: &JobId) -> Option<String> {
        fs::read_to_string(self.control_path(id, ControlFile::Failed))
            .ok()
            .map(|s| s.trim_end().to_string())
    }

    pub fn clear_failure(&self, id: &JobId) -> Result<(), StorageError> {
        remove_if_exists(&self.control_path(id, ControlFile::Failed))
    }

    /// Append a line to the per-job log.
    ///
    /// Format: `2026-01-30T08:14:09Z [PREPARING] message`
    ///
    /// Failures are logged via tracing but do not propagate.
    pub fn append_errors(&self, id: &JobId, state: JobState, message: &str) {
        let path = self.control_path(id, ControlFile::Errors);
        let line = format!("{} [{}] {}", format_utc_now(), state, message);
        if let Err(e) = append_line(&path, &line) {
            tracing::warn!(job_id = %id, error = %e, "failed to write job errors log");
        }
    }

    // ── transfer lists ──────────────────────────────────────────────────

    /// Remaining transfers. A missing list is empty.
    pub fn read_list(&self, id: &JobId, list: TransferList) -> Result<Vec<FileData>, StorageError> {
        let path = self.control_path(id, list.file());
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(path, e)),
        };
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| {
                FileData::parse(l).ok_or_else(|| StorageError::Parse {
                    path: path.clone(),
                    source: arex_core::ParseError::InvalidFile(l.to_string()),
                })
            })
            .collect()
    }

    pub fn write_list(
        &self,
        id: &JobId,
        list: TransferList,
        files: &[FileData],
    ) -> Result<(), StorageError> {
        let content: String = files.iter().map(|f| format!("{f}\n")).collect();
        write_atomic(&self.control_path(id, list.file()), content.as_bytes())
    }

    pub fn has_list(&self, id: &JobId, list: TransferList) -> bool {
        self.control_path(id, list.file()).is_file()
    }

    /// Lines of `input_status`/`output_status`: names already transferred.
    pub fn read_transferred(&self, id: &JobId, list: TransferList) -> Vec<String> {
        fs::read_to_string(self.control_path(id, list.status_file()))
            .map(|c| c.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from).collect())
            .unwrap_or_default()
    }

    pub fn add_transferred(&self, id: &JobId, list: TransferList, name: &str) -> Result<(), StorageError> {
        let path = self.control_path(id, list.status_file());
        append_line(&path, name).map_err(|e| StorageError::io(path, e))
    }

    /// Client confirmed it finished pushing input files.
    pub fn stagein_confirmed(&self, id: &JobId) -> bool {
        self.read_transferred(id, TransferList::Input).iter().any(|l| l == STAGEIN_DONE)
    }

    pub(crate) fn remove_control(&self, id: &JobId, file: ControlFile) -> Result<(), StorageError> {
        remove_if_exists(&self.control_path(id, file))
    }
}

/// Write to `<path>.tmp` then rename over `path`.
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> Result<(), StorageError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, content)
        .and_then(|_| fs::rename(&tmp, path))
        .map_err(|e| StorageError::io(path, e))
}

pub(crate) fn remove_if_exists(path: &Path) -> Result<(), StorageError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StorageError::io(path, e)),
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
