// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

fn job(state: JobState) -> GmJob {
    let local = LocalDescription {
        subject: "/CN=Alice".to_string(),
        jobname: "render".to_string(),
        lrms: "slurm".to_string(),
        queue: "short".to_string(),
        ..Default::default()
    };
    GmJob::builder().id("job-7").state(state).local(local).build()
}

fn setup() -> (TempDir, JobLog) {
    let dir = TempDir::new().unwrap();
    let log = JobLog::new(Some(dir.path().join("joblog")), dir.path().join("logs"));
    (dir, log)
}

#[test]
fn started_and_finished_lines() {
    let (dir, log) = setup();
    log.started(&job(JobState::Preparing));
    log.finished(&job(JobState::Finished), Some("LRMS error: (1) boom\nsecond"));
    let content = std::fs::read_to_string(dir.path().join("joblog")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains(
        "Started - job id: job-7, unix user: 1000:1000, name: \"render\", owner: \"/CN=Alice\", lrms: slurm, queue: short"
    ));
    assert!(lines[1].contains("Finished - job id: job-7"));
    assert!(lines[1].ends_with(", failure: \"LRMS error: (1) boom; second\""));
}

#[test]
fn no_joblog_configured_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let log = JobLog::new(None, dir.path().join("logs"));
    log.started(&job(JobState::Preparing));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn accepted_record_has_no_end_time() {
    let (dir, log) = setup();
    log.write_record(&job(JobState::Accepted), 1_700_000_000, 0, None);
    let content = std::fs::read_to_string(dir.path().join("logs/job-7.accepted")).unwrap();
    assert!(content.contains("ngjobid=job-7\n"));
    assert!(content.contains("usersn=/CN=Alice\n"));
    assert!(content.contains("submissiontime=2023-11-14T22:13:20Z\n"));
    assert!(!content.contains("endtime="));
    assert!(!content.contains("status="));
}

#[yare::parameterized(
    completed = { None, "status=completed" },
    failed = { Some("Data download failed"), "status=failed" },
)]
fn finished_record_status(failure: Option<&str>, expected: &str) {
    let (dir, log) = setup();
    log.write_record(&job(JobState::Finished), 1_700_000_000, 1_700_000_600, failure);
    let content = std::fs::read_to_string(dir.path().join("logs/job-7.finished")).unwrap();
    assert!(content.contains("endtime=2023-11-14T22:23:20Z\n"));
    assert!(content.contains(expected));
}

#[test]
fn other_states_write_no_record() {
    let (dir, log) = setup();
    log.write_record(&job(JobState::InLrms), 0, 0, None);
    assert!(!dir.path().join("logs").exists());
}
