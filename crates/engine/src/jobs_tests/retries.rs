// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use arex_core::test_support::ScriptedProcess;
use std::time::Duration;

fn staged_job(ctx: &TestContext) -> JobId {
    let mut desc = local();
    desc.inputs = vec![remote("in.dat")];
    desc.outputs = vec![remote("out.dat")];
    ctx.submit("job-1", desc)
}

fn next_retry(ctx: &TestContext, id: &JobId) -> u64 {
    let at = ctx.list.get(id).and_then(|j| j.next_retry).unwrap();
    at - ctx.clock.epoch_secs()
}

#[test]
fn download_retries_back_off_then_succeed() {
    let mut ctx = setup_with(|c| c.max_retries(5).retry_base_secs(10));
    ctx.stager.push_codes(Direction::Download, &[4, 4, 0]);
    let id = staged_job(&ctx);

    ctx.passes(2);
    assert_eq!(ctx.state(&id), JobState::Preparing);

    ctx.pass();
    assert_eq!(ctx.state(&id), JobState::Accepted);
    let first = next_retry(&ctx, &id);
    assert!((5..=15).contains(&first), "first delay {first}");

    // Deadline not reached: nothing restarts
    ctx.pass();
    assert_eq!(ctx.state(&id), JobState::Accepted);
    assert_eq!(ctx.stager.count(Direction::Download), 1);

    ctx.clock.advance(Duration::from_secs(first + 1));
    ctx.pass();
    assert_eq!(ctx.state(&id), JobState::Preparing);
    ctx.pass();
    assert_eq!(ctx.state(&id), JobState::Accepted);
    let second = next_retry(&ctx, &id);
    assert!((20..=60).contains(&second), "second delay {second}");

    ctx.clock.advance(Duration::from_secs(second + 1));
    ctx.passes(2);
    assert_eq!(ctx.state(&id), JobState::Submitting);
    assert_eq!(ctx.stager.count(Direction::Download), 3);
    let job = ctx.list.get(&id).unwrap();
    assert_eq!(job.retries, 3);
    assert_eq!(job.next_retry, None);
}

#[test]
fn huge_retry_base_keeps_deadline_in_future() {
    let mut ctx = setup_with(|c| c.max_retries(5).retry_base_secs(u64::MAX));
    ctx.stager.push_codes(Direction::Download, &[4]);
    let id = staged_job(&ctx);

    ctx.passes(3);
    assert_eq!(ctx.state(&id), JobState::Accepted);
    let at = ctx.list.get(&id).and_then(|j| j.next_retry).unwrap();
    assert!(at > ctx.clock.epoch_secs());
}

#[test]
fn download_without_retries_left_fails() {
    let mut ctx = setup_with(|c| c.max_retries(0));
    ctx.stager.push_codes(Direction::Download, &[4]);
    let id = staged_job(&ctx);

    ctx.passes(3);

    assert!(ctx.failure(&id).contains("Data download failed. No retries left."));
    assert_eq!(ctx.local(&id).failedstate, "PREPARING");
    // Outputs with a destination are still staged out after a failure
    assert_eq!(ctx.state(&id), JobState::Finishing);
    assert_eq!(ctx.stager.count(Direction::Upload), 1);
}

#[test]
fn hung_downloader_is_killed_and_fails_the_job() {
    let mut ctx = setup();
    let helper = ScriptedProcess::never_exits();
    ctx.stager.push(Direction::Download, helper.clone());
    let mut desc = local();
    desc.inputs = vec![remote("in.dat")];
    let id = ctx.submit("job-1", desc);

    ctx.passes(2);
    ctx.clock.advance(Duration::from_secs(30 * 60));
    ctx.pass();
    assert_eq!(ctx.state(&id), JobState::Preparing);
    assert!(!helper.was_killed());

    ctx.clock.advance(Duration::from_secs(31 * 60));
    ctx.pass();

    assert!(helper.was_killed());
    assert!(ctx.failure(&id).contains("Data download timed out"));
    assert_eq!(ctx.state(&id), JobState::Finished);
}

#[test]
fn upload_retry_waits_in_lrms_state() {
    let mut ctx = setup_with(|c| c.retry_base_secs(10));
    ctx.stager.push_codes(Direction::Upload, &[4, 0]);
    let mut desc = local();
    desc.outputs = vec![remote("out.dat")];
    let id = ctx.submit("job-1", desc);
    ctx.run_to_inlrms(&id);
    ctx.lrms_finished(&id, 0);

    ctx.pass();
    assert_eq!(ctx.state(&id), JobState::Finishing);
    ctx.pass();
    let status = ctx.status(&id);
    assert_eq!(status.state, JobState::InLrms);
    assert!(status.pending);

    ctx.pass();
    assert_eq!(ctx.stager.count(Direction::Upload), 1);

    ctx.clock.advance(Duration::from_secs(61));
    ctx.passes(2);
    assert_eq!(ctx.stager.count(Direction::Upload), 2);
    assert_eq!(ctx.state(&id), JobState::Finished);
    assert!(ctx.failure(&id).is_empty());
}

#[test]
fn failing_downloader_exit_fails_without_retry() {
    let mut ctx = setup();
    ctx.stager.push_codes(Direction::Download, &[1]);
    let id = staged_job(&ctx);

    ctx.passes(3);

    assert!(ctx.failure(&id).contains("Data download failed"));
    assert!(!ctx.failure(&id).contains("No retries left"));
    assert_eq!(ctx.stager.count(Direction::Download), 1);
}
