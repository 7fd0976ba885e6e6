// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use arex_adapters::PluginOutcome;
use arex_core::test_support::ScriptedProcess;
use arex_core::PluginAction;
use std::time::Duration;

#[test]
fn lrms_failure_still_stages_out() {
    let mut ctx = setup();
    let mut desc = local();
    desc.outputs = vec![remote("out.dat")];
    let id = ctx.submit("job-1", desc);
    ctx.run_to_inlrms(&id);

    ctx.lrms_finished(&id, 1);
    ctx.pass();

    assert!(ctx.failure(&id).contains("LRMS error: (1) Job finished"));
    let local = ctx.local(&id);
    assert_eq!(local.failedstate, "INLRMS");
    assert_eq!(local.failedcause, "internal");
    assert_eq!(ctx.state(&id), JobState::Finishing);
    assert_eq!(ctx.stager.count(Direction::Upload), 1);

    ctx.pass();
    assert_eq!(ctx.state(&id), JobState::Finished);
}

#[test]
fn custom_success_code_is_honoured() {
    let mut ctx = setup();
    let mut desc = local();
    desc.successcode = 3;
    let id = ctx.submit("job-1", desc);
    ctx.run_to_inlrms(&id);

    ctx.lrms_finished(&id, 3);
    ctx.pass();

    assert_eq!(ctx.state(&id), JobState::Finished);
    assert!(ctx.failure(&id).is_empty());
}

#[test]
fn failed_submit_helper_fails_the_job() {
    let mut ctx = setup();
    ctx.lrms.push_submit(ScriptedProcess::exits_after(0, 1));
    let id = ctx.submit("job-1", local());

    ctx.passes(3);

    assert!(ctx.failure(&id).contains("Job submission to LRMS failed"));
    assert_eq!(ctx.local(&id).failedstate, "SUBMIT");
    assert_eq!(ctx.state(&id), JobState::Finished);
}

#[test]
fn submit_without_lrms_id_fails_the_job() {
    let mut ctx = setup();
    let id = ctx.submit("job-1", local());

    ctx.passes(3);

    assert!(ctx.failure(&id).contains("Failed extracting LRMS ID due to some internal error"));
    assert_eq!(ctx.state(&id), JobState::Finished);
}

#[test]
fn unstartable_submit_helper_fails_the_job() {
    let mut ctx = setup();
    ctx.lrms.fail_spawn();
    let id = ctx.submit("job-1", local());

    ctx.passes(2);

    assert!(ctx.failure(&id).contains("Failed initiating job submission to LRMS"));
    assert_eq!(ctx.state(&id), JobState::Finished);
}

#[test]
fn slow_submission_with_known_id_is_accepted() {
    let mut ctx = setup();
    let submit = ScriptedProcess::never_exits();
    ctx.lrms.push_submit(submit.clone());
    let id = ctx.submit("job-1", local());
    ctx.passes(2);

    // Suspicious but no id yet: keep waiting
    ctx.clock.advance(Duration::from_secs(11 * 60));
    ctx.pass();
    assert_eq!(ctx.state(&id), JobState::Submitting);

    ctx.assign_local_id(&id, "555");
    ctx.pass();

    assert!(submit.was_killed());
    assert_eq!(ctx.state(&id), JobState::InLrms);
    assert_eq!(ctx.local(&id).localid, "555");
}

#[test]
fn hung_submission_times_out() {
    let mut ctx = setup();
    let submit = ScriptedProcess::never_exits();
    ctx.lrms.push_submit(submit.clone());
    let id = ctx.submit("job-1", local());
    ctx.passes(2);

    ctx.clock.advance(Duration::from_secs(61 * 60));
    ctx.pass();

    assert!(submit.was_killed());
    assert!(ctx.failure(&id).contains("Job submission to LRMS takes too long"));
    assert_eq!(ctx.state(&id), JobState::Finished);
}

#[test]
fn plugin_can_reject_a_new_job() {
    let mut ctx = setup();
    ctx.plugins.on_state(
        JobState::Accepted,
        PluginOutcome { action: PluginAction::Fail, response: "quota exceeded".to_string() },
    );
    let id = ctx.submit("job-1", local());

    ctx.pass();

    assert!(ctx.failure(&id).contains("Plugin at state ACCEPTED failed: quota exceeded"));
    assert_eq!(ctx.local(&id).failedstate, "ACCEPTED");
    assert_eq!(ctx.state(&id), JobState::Finished);
    assert!(ctx.lrms.calls().is_empty());
}

#[test]
fn logging_plugin_does_not_fail_the_job() {
    let mut ctx = setup();
    ctx.plugins.on_state(
        JobState::Accepted,
        PluginOutcome { action: PluginAction::Log, response: "noted".to_string() },
    );
    let id = ctx.submit("job-1", local());

    ctx.passes(2);

    assert_eq!(ctx.state(&id), JobState::Submitting);
    assert!(ctx.failure(&id).is_empty());
}

#[test]
fn notifications_follow_the_notify_flags() {
    let mut ctx = setup();
    let mut desc = local();
    desc.notify = "user@example.org".to_string();
    let id = ctx.submit("job-1", desc);
    ctx.run_to_inlrms(&id);
    ctx.lrms_finished(&id, 0);
    ctx.pass();

    let calls = ctx.mailer.calls();
    let states: Vec<JobState> = calls.iter().map(|c| c.state).collect();
    assert_eq!(states, vec![JobState::Preparing, JobState::Finished]);
    assert!(calls.iter().all(|c| c.recipients == vec!["user@example.org".to_string()]));
}

#[test]
fn failure_mail_carries_the_reason() {
    let mut ctx = setup();
    let mut desc = local();
    desc.notify = "e ops@example.org".to_string();
    desc.dryrun = true;
    let id = ctx.submit("job-1", desc);

    ctx.passes(2);

    let calls = ctx.mailer.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, id);
    assert_eq!(calls[0].state, JobState::Finished);
    assert!(calls[0].failure.contains("Job has dryrun requested. Job skipped."));
}

#[test]
fn dry_run_is_never_executed() {
    let mut ctx = setup();
    let mut desc = local();
    desc.dryrun = true;
    let id = ctx.submit("job-1", desc);

    ctx.passes(2);

    assert_eq!(ctx.state(&id), JobState::Finished);
    assert_eq!(ctx.local(&id).failedstate, "ACCEPTED");
    assert!(ctx.lrms.calls().is_empty());
}

#[test]
fn unrecordable_failure_forces_finished() {
    let mut ctx = setup();
    let mut desc = local();
    desc.dryrun = true;
    let id = ctx.submit("job-1", desc);
    ctx.pass();

    // Local description can no longer be rewritten
    let path = ctx.store().control_path(&id, ControlFile::Local);
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();
    let summary = ctx.pass();

    assert_eq!(summary.failed, 1);
    assert!(!summary.is_ok());
    assert_eq!(ctx.state(&id), JobState::Finished);
    let failure = ctx.failure(&id);
    assert!(failure.contains("Job has dryrun requested. Job skipped."));
    assert!(failure.contains("Serious troubles (problems during processing problems)"));
    assert!(!ctx.list.contains(&id));
}
