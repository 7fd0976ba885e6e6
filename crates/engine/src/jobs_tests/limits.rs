// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use arex_core::test_support::ScriptedProcess;

fn staging_job(ctx: &TestContext, id: &str, share: &str) -> JobId {
    let mut desc = local();
    desc.inputs = vec![remote("in.dat")];
    desc.transfershare = share.to_string();
    ctx.submit(id, desc)
}

#[test]
fn second_job_of_same_identity_waits_for_the_first() {
    let mut ctx = setup_with(|c| c.max_jobs_per_dn(Limit::Max(1)));
    let first = ctx.submit("job-1", local());
    let second = ctx.submit("job-2", local());

    ctx.passes(2);
    assert_eq!(ctx.state(&first), JobState::Submitting);
    let status = ctx.status(&second);
    assert_eq!(status.to_string(), "PENDING:ACCEPTED");
    assert_eq!(ctx.list.counters().per_dn("/CN=Alice"), 1);

    ctx.assign_local_id(&first, "1");
    ctx.pass();
    assert_eq!(ctx.state(&second), JobState::Accepted);

    ctx.lrms_finished(&first, 0);
    ctx.pass();
    assert_eq!(ctx.state(&first), JobState::Finished);
    let status = ctx.status(&second);
    assert_ne!(status.state, JobState::Accepted);
    assert!(!status.pending);
}

#[test]
fn other_identities_are_not_held_back() {
    let mut ctx = setup_with(|c| c.max_jobs_per_dn(Limit::Max(1)));
    ctx.submit("job-1", local());
    let mut bob = local();
    bob.subject = "/CN=Bob".to_string();
    let other = ctx.submit("job-2", bob);

    ctx.passes(2);

    assert_eq!(ctx.state(&other), JobState::Submitting);
}

#[test]
fn staging_cap_admits_one_preparing_job() {
    let mut ctx = setup_with(|c| c.max_jobs_staging(Limit::Max(1)));
    let helper = ScriptedProcess::never_exits();
    ctx.stager.push(Direction::Download, helper.clone());
    let first = staging_job(&ctx, "job-1", "");
    let second = staging_job(&ctx, "job-2", "");

    ctx.passes(2);
    assert_eq!(ctx.state(&first), JobState::Preparing);
    assert_eq!(ctx.status(&second).to_string(), "PENDING:ACCEPTED");
    assert_eq!(ctx.stager.count(Direction::Download), 1);

    ctx.pass();
    assert_eq!(ctx.stager.count(Direction::Download), 1);

    helper.finish(0);
    ctx.pass();
    assert_eq!(ctx.state(&first), JobState::Submitting);
    assert_eq!(ctx.state(&second), JobState::Preparing);
    assert_eq!(ctx.stager.count(Direction::Download), 2);
}

#[test]
fn per_share_ceiling_spreads_slots_across_shares() {
    let mut ctx = setup_with(|c| c.max_jobs_per_share(Limit::Max(1)));
    for _ in 0..3 {
        ctx.stager.push(Direction::Download, ScriptedProcess::never_exits());
    }
    let a1 = staging_job(&ctx, "job-1", "atlas");
    let a2 = staging_job(&ctx, "job-2", "atlas");
    let c1 = staging_job(&ctx, "job-3", "cms");

    ctx.passes(2);

    assert_eq!(ctx.state(&a1), JobState::Preparing);
    assert_eq!(ctx.status(&a2).to_string(), "PENDING:ACCEPTED");
    assert_eq!(ctx.state(&c1), JobState::Preparing);
    assert_eq!(ctx.list.allocation().slots(Direction::Download, "atlas"), Some(1));
}

#[test]
fn running_limit_holds_jobs_in_preparing() {
    let mut ctx = setup_with(|c| c.max_jobs_running(Limit::Max(0)));
    let id = ctx.submit("job-1", local());

    ctx.passes(3);

    assert_eq!(ctx.status(&id).to_string(), "PENDING:PREPARING");
    assert!(ctx.lrms.calls().is_empty());
    let errors =
        std::fs::read_to_string(ctx.store().control_path(&id, ControlFile::Errors)).unwrap();
    assert_eq!(errors.matches("Pending: Limit of RUNNING jobs is reached").count(), 1);
}

#[test]
fn script_limit_defers_submission() {
    let mut ctx = setup_with(|c| c.max_scripts(Limit::Max(0)));
    let id = ctx.submit("job-1", local());

    ctx.passes(3);

    assert_eq!(ctx.state(&id), JobState::Submitting);
    assert!(ctx.lrms.calls().is_empty());
}

#[test]
fn script_limit_counts_running_helpers() {
    let mut ctx = setup_with(|c| c.max_scripts(Limit::Max(1)));
    ctx.lrms.push_submit(ScriptedProcess::never_exits());
    let first = ctx.submit("job-1", local());
    let second = ctx.submit("job-2", local());

    ctx.passes(3);

    assert_eq!(ctx.lrms.calls(), vec![arex_adapters::LrmsCall::Submit(first)]);
    assert_eq!(ctx.state(&second), JobState::Submitting);
}

#[test]
fn job_limit_caps_loaded_jobs() {
    let mut ctx = setup_with(|c| c.max_jobs(Limit::Max(1)));
    let first = ctx.submit("job-1", local());
    let second = ctx.submit("job-2", local());

    ctx.pass();
    assert_eq!(ctx.list.len(), 1);
    assert!(ctx.list.contains(&first));
    assert!(!ctx.list.contains(&second));

    ctx.pass();
    ctx.assign_local_id(&first, "1");
    ctx.pass();
    ctx.lrms_finished(&first, 0);
    ctx.pass();
    assert_eq!(ctx.state(&first), JobState::Finished);

    ctx.pass();
    assert!(ctx.list.contains(&second));
}
