// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use arex_core::test_support::ScriptedProcess;

const CANCELLED: &str = "User requested to cancel the job.";

#[test]
fn cancel_in_lrms_runs_the_cancel_helper() {
    let mut ctx = setup();
    let mut desc = local();
    desc.outputs = vec![remote("out.dat"), FileData::new("stdout", "")];
    let id = ctx.submit("job-1", desc);
    ctx.run_to_inlrms(&id);

    ctx.store().set_mark(&id, Mark::Cancel).unwrap();
    ctx.pass();
    assert_eq!(ctx.state(&id), JobState::Canceling);
    assert_eq!(ctx.lrms.cancel_count(), 1);
    assert!(!ctx.store().has_mark(&id, Mark::Cancel));

    ctx.pass();
    assert_eq!(ctx.state(&id), JobState::Finished);
    assert!(ctx.failure(&id).contains(CANCELLED));
    let local = ctx.local(&id);
    assert_eq!(local.failedstate, "INLRMS");
    assert_eq!(local.failedcause, "client");
    // Cancelled jobs upload nothing
    assert_eq!(ctx.stager.count(Direction::Upload), 0);
    let outputs = ctx.store().read_list(&id, TransferList::Output).unwrap();
    assert_eq!(outputs, vec![FileData::new("stdout", "")]);
}

#[test]
fn cancel_mark_on_unloaded_job_waits_for_load() {
    let mut ctx = setup();
    let id = ctx.submit("job-1", local());
    ctx.store().set_mark(&id, Mark::Cancel).unwrap();

    ctx.pass();
    assert_eq!(ctx.state(&id), JobState::Accepted);
    assert!(ctx.store().has_mark(&id, Mark::Cancel));

    ctx.pass();
    assert_eq!(ctx.state(&id), JobState::Finished);
    assert!(ctx.lrms.calls().is_empty());
    assert!(ctx.stager.calls().is_empty());
    assert_eq!(ctx.local(&id).failedstate, "ACCEPTED");
    assert!(ctx.failure(&id).contains(CANCELLED));
}

#[test]
fn cancel_during_upload_finishes_the_job() {
    let mut ctx = setup();
    let upload = ScriptedProcess::never_exits();
    ctx.stager.push(Direction::Upload, upload.clone());
    let mut desc = local();
    desc.outputs = vec![remote("out.dat")];
    let id = ctx.submit("job-1", desc);
    ctx.run_to_inlrms(&id);
    ctx.lrms_finished(&id, 0);
    ctx.pass();
    assert_eq!(ctx.state(&id), JobState::Finishing);

    ctx.store().set_mark(&id, Mark::Cancel).unwrap();
    ctx.pass();

    assert!(upload.was_killed());
    assert_eq!(ctx.state(&id), JobState::Finished);
    assert_eq!(ctx.stager.count(Direction::Upload), 1);
    assert_eq!(ctx.lrms.cancel_count(), 0);
}

#[test]
fn cancel_during_submission_with_known_id_cancels_in_lrms() {
    let mut ctx = setup();
    let submit = ScriptedProcess::never_exits();
    ctx.lrms.push_submit(submit.clone());
    let id = ctx.submit("job-1", local());
    ctx.passes(2);
    ctx.assign_local_id(&id, "77");

    ctx.store().set_mark(&id, Mark::Cancel).unwrap();
    ctx.pass();

    assert!(submit.was_killed());
    assert_eq!(ctx.state(&id), JobState::Canceling);
    assert_eq!(ctx.local(&id).localid, "77");
    assert_eq!(ctx.lrms.cancel_count(), 1);
}

#[test]
fn cancel_during_submission_without_id_skips_the_lrms() {
    let mut ctx = setup();
    ctx.lrms.push_submit(ScriptedProcess::never_exits());
    let id = ctx.submit("job-1", local());
    ctx.passes(2);

    ctx.store().set_mark(&id, Mark::Cancel).unwrap();
    ctx.pass();

    assert_eq!(ctx.state(&id), JobState::Finished);
    assert_eq!(ctx.lrms.cancel_count(), 0);
    assert_eq!(ctx.local(&id).failedstate, "SUBMIT");
}

#[test]
fn failed_cancel_helper_fails_the_job() {
    let mut ctx = setup();
    ctx.lrms.push_cancel(ScriptedProcess::exits_after(0, 1));
    let id = ctx.submit("job-1", local());
    ctx.run_to_inlrms(&id);

    ctx.store().set_mark(&id, Mark::Cancel).unwrap();
    ctx.passes(2);

    assert_eq!(ctx.state(&id), JobState::Finished);
    let failure = ctx.failure(&id);
    assert!(failure.contains(CANCELLED));
    assert!(failure.contains("Failed to cancel running job"));
}

#[test]
fn cancel_after_lrms_completion_skips_the_helper() {
    let mut ctx = setup();
    let id = ctx.submit("job-1", local());
    ctx.run_to_inlrms(&id);
    ctx.lrms.push_cancel(ScriptedProcess::never_exits());

    // Cancel and completion race: the job is cancelled before the outcome is read
    ctx.lrms_finished(&id, 0);
    ctx.store().set_mark(&id, Mark::Cancel).unwrap();
    ctx.pass();

    assert_eq!(ctx.lrms.cancel_count(), 0);
    assert_eq!(ctx.state(&id), JobState::Finished);
}
