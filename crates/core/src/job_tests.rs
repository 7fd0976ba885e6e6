// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::ScriptedProcess;
use std::time::Instant;

#[test]
fn add_failure_accumulates_lines() {
    let mut job = GmJob::builder().build();
    job.add_failure("Data download failed");
    job.add_failure("   ");
    job.add_failure("No retries left");
    assert_eq!(job.failure(), "Data download failed\nNo retries left");
}

#[test]
fn take_failure_flushes_once() {
    let mut job = GmJob::builder().build();
    job.add_failure("boom");
    assert_eq!(job.take_failure(), "boom");
    assert_eq!(job.failure(), "");
    assert_eq!(job.take_failure(), "");
}

#[test]
fn start_stamps_time() {
    let mut job = GmJob::new(JobId::new("a"), Owner::new(1, 2), JobState::Accepted);
    assert_eq!(job.start_time, None);
    job.start(1234);
    assert_eq!(job.start_time, Some(1234));
}

#[test]
fn subject_comes_from_local_description() {
    let job = GmJob::builder().build();
    assert_eq!(job.subject(), "");
    let local = LocalDescription { subject: "/CN=Carol".to_string(), ..Default::default() };
    let job = GmJob::builder().local(local).build();
    assert_eq!(job.subject(), "/CN=Carol");
    assert!(!job.has_executable());
}

#[test]
fn release_child_kills_running_helper() {
    let process = ScriptedProcess::never_exits();
    let mut job = GmJob::builder().build();
    job.child = Some(ChildHandle::new(Box::new(process.clone()), Instant::now()));
    job.release_child();
    assert!(job.child.is_none());
    assert!(process.was_killed());
}

#[test]
fn owner_display() {
    assert_eq!(Owner::new(1000, 100).to_string(), "1000:100");
}
