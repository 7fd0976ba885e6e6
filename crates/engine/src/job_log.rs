// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Accounting output: the shared job log and per-job summary records.
//!
//! The job log gets one `Started` line when a job enters PREPARING and one
//! `Finished` line when it reaches FINISHED. Summary records are dropped into
//! `<control>/logs/` at ACCEPTED and FINISHED for the reporter to pick up.
//!
//! Failures are logged via tracing but never propagate.

use arex_core::{format_epoch, format_utc_now, GmJob, JobState, LocalDescription};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct JobLog {
    /// Shared `Started`/`Finished` log, if configured.
    joblog: Option<PathBuf>,
    /// Directory receiving summary records.
    records_dir: PathBuf,
}

impl JobLog {
    pub fn new(joblog: Option<PathBuf>, records_dir: PathBuf) -> Self {
        Self { joblog, records_dir }
    }

    pub fn records_dir(&self) -> &Path {
        &self.records_dir
    }

    /// Format: `2026-01-30T08:14:09Z Started - job id: <id>, unix user: 1000:1000, name: "...", owner: "<dn>", lrms: <lrms>, queue: <queue>`
    pub fn started(&self, job: &GmJob) {
        let line = format!("{} Started - {}", format_utc_now(), describe(job));
        self.append(job, &line);
    }

    /// As [`JobLog::started`] plus `, failure: "<reason>"` for failed jobs.
    pub fn finished(&self, job: &GmJob, failure: Option<&str>) {
        let mut line = format!("{} Finished - {}", format_utc_now(), describe(job));
        if let Some(failure) = failure.filter(|f| !f.is_empty()) {
            line.push_str(&format!(", failure: \"{}\"", one_line(failure)));
        }
        self.append(job, &line);
    }

    fn append(&self, job: &GmJob, line: &str) {
        let Some(path) = &self.joblog else { return };
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut f| writeln!(f, "{line}"));
        if let Err(e) = result {
            tracing::warn!(job_id = %job.id, error = %e, "failed to write job log");
        }
    }

    /// Write the summary record for the job's current state.
    ///
    /// Only ACCEPTED and FINISHED produce records. `submitted` and `ended` are
    /// epoch seconds; `failure` is the persisted failure reason, if any.
    pub fn write_record(&self, job: &GmJob, submitted: u64, ended: u64, failure: Option<&str>) {
        let suffix = match job.state {
            JobState::Accepted => "accepted",
            JobState::Finished => "finished",
            _ => return,
        };
        let content = record(job, submitted, ended, failure);
        let path = self.records_dir.join(format!("{}.{suffix}", job.id));
        let tmp = path.with_extension(format!("{suffix}.tmp"));
        let result = fs::create_dir_all(&self.records_dir)
            .and_then(|_| fs::write(&tmp, content.as_bytes()))
            .and_then(|_| fs::rename(&tmp, &path));
        if let Err(e) = result {
            tracing::warn!(job_id = %job.id, error = %e, "failed to write accounting record");
        }
    }
}

fn describe(job: &GmJob) -> String {
    let empty = LocalDescription::default();
    let local = job.local.as_ref().unwrap_or(&empty);
    format!(
        "job id: {}, unix user: {}, name: \"{}\", owner: \"{}\", lrms: {}, queue: {}",
        job.id,
        job.owner,
        one_line(&local.jobname),
        local.subject,
        local.lrms,
        local.queue
    )
}

/// `key=value` summary record.
fn record(job: &GmJob, submitted: u64, ended: u64, failure: Option<&str>) -> String {
    let empty = LocalDescription::default();
    let local = job.local.as_ref().unwrap_or(&empty);
    let mut out = String::new();
    let mut kv = |key: &str, value: &str| {
        if !value.is_empty() {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        }
    };
    kv("ngjobid", job.id.as_str());
    kv("submissiontime", &format_epoch(submitted));
    kv("usersn", &local.subject);
    kv("lrms", &local.lrms);
    kv("queue", &local.queue);
    kv("localid", &local.localid);
    kv("jobname", &local.jobname);
    kv("globalid", &local.globalid);
    kv("localuser", &job.owner.to_string());
    if job.state == JobState::Finished {
        kv("endtime", &format_epoch(ended));
        let failure = failure.unwrap_or("").trim();
        kv("failurestring", &one_line(failure));
        kv("status", if failure.is_empty() { "completed" } else { "failed" });
    }
    out
}

fn one_line(s: &str) -> String {
    s.lines().map(str::trim).filter(|l| !l.is_empty()).collect::<Vec<_>>().join("; ")
}

#[cfg(test)]
#[path = "job_log_tests.rs"]
mod tests;
