// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

/// A job that failed in `failed_state` and sits in FINISHED.
fn failed_job(ctx: &TestContext, failed_state: &str, downloads: u32) -> JobId {
    let mut desc = local();
    if downloads > 0 {
        desc.inputs = vec![remote("in.dat")];
    }
    desc.outputs = vec![remote("out.dat")];
    desc.reruns = 1;
    desc.downloads = downloads;
    desc.failedstate = failed_state.to_string();
    desc.failedcause = "internal".to_string();
    let id = ctx.submit("job-1", desc);
    let store = ctx.store();
    store.write_list(&id, TransferList::Input, &[]).unwrap();
    store.write_list(&id, TransferList::Output, &[]).unwrap();
    store.append_failure(&id, "Data download failed").unwrap();
    store.write_status(&id, StatusRecord::new(JobState::Finished, false)).unwrap();
    id
}

#[test]
fn restart_replays_a_failed_download() {
    let mut ctx = setup();
    let id = failed_job(&ctx, "PREPARING", 1);
    ctx.store().set_mark(&id, Mark::Restart).unwrap();

    ctx.pass();

    assert_eq!(ctx.status(&id).to_string(), "PENDING:ACCEPTED");
    assert_eq!(ctx.store().status_bucket(&id), Some(Bucket::Accepting));
    assert!(!ctx.store().has_mark(&id, Mark::Restart));
    assert_eq!(ctx.failure(&id), "");
    let local = ctx.local(&id);
    assert_eq!(local.reruns, 0);
    assert_eq!(local.failedstate, "");
    assert_eq!(local.cleanuptime, None);
    let inputs = ctx.store().read_list(&id, TransferList::Input).unwrap();
    assert_eq!(inputs, vec![remote("in.dat")]);
    let outputs = ctx.store().read_list(&id, TransferList::Output).unwrap();
    assert_eq!(outputs, vec![remote("out.dat")]);

    ctx.pass();
    assert_eq!(ctx.state(&id), JobState::Preparing);
    assert_eq!(ctx.stager.count(Direction::Download), 1);
}

#[yare::parameterized(
    failed_download = { "PREPARING", 1, "PENDING:ACCEPTED" },
    failed_submit_with_inputs = { "SUBMIT", 1, "PENDING:ACCEPTED" },
    failed_in_lrms = { "INLRMS", 0, "SUBMIT" },
    failed_upload = { "FINISHING", 0, "PENDING:INLRMS" },
)]
fn restart_resumes_from_failed_phase(failed_state: &str, downloads: u32, expected: &str) {
    let mut ctx = setup();
    let id = failed_job(&ctx, failed_state, downloads);
    ctx.store().set_mark(&id, Mark::Restart).unwrap();

    ctx.pass();

    assert_eq!(ctx.status(&id).to_string(), expected);
}

#[test]
fn restart_without_reruns_is_refused() {
    let mut ctx = setup();
    let id = failed_job(&ctx, "PREPARING", 1);
    let mut desc = ctx.local(&id);
    desc.reruns = 0;
    ctx.store().write_local(&id, &desc).unwrap();
    ctx.store().set_mark(&id, Mark::Restart).unwrap();

    ctx.pass();

    assert_eq!(ctx.state(&id), JobState::Finished);
    assert!(!ctx.store().has_mark(&id, Mark::Restart));
    assert!(!ctx.list.contains(&id));
    assert_eq!(ctx.failure(&id), "Data download failed");
}

#[test]
fn restart_of_job_that_never_failed_is_refused() {
    let mut ctx = setup();
    let id = failed_job(&ctx, "", 0);
    ctx.store().set_mark(&id, Mark::Restart).unwrap();

    ctx.pass();

    assert_eq!(ctx.state(&id), JobState::Finished);
    assert_eq!(ctx.local(&id).reruns, 1);
}

#[test]
fn clean_mark_removes_the_job() {
    let mut ctx = setup();
    let id = failed_job(&ctx, "PREPARING", 1);
    std::fs::create_dir_all(ctx.session_root().join("job-1")).unwrap();
    ctx.store().set_mark(&id, Mark::Clean).unwrap();

    ctx.pass();

    assert!(ctx.store().read_status(&id).unwrap_err().is_not_found());
    assert!(ctx.store().read_local(&id).is_err());
    assert!(!ctx.store().has_mark(&id, Mark::Clean));
    assert!(!ctx.session_root().join("job-1").exists());
    assert!(!ctx.list.contains(&id));
}

#[test]
fn expired_job_moves_to_deleted() {
    let mut ctx = setup_with(|c| c.keep_deleted(3600));
    let id = failed_job(&ctx, "PREPARING", 1);
    let mut desc = ctx.local(&id);
    desc.lifetime = Some(0);
    ctx.store().write_local(&id, &desc).unwrap();
    std::fs::create_dir_all(ctx.session_root().join("job-1")).unwrap();
    ctx.clock.advance(std::time::Duration::from_secs(2));

    ctx.pass();

    assert_eq!(ctx.state(&id), JobState::Deleted);
    assert!(!ctx.session_root().join("job-1").exists());
    assert!(!ctx.store().has_list(&id, TransferList::Output));
    // Kept for inspection
    assert!(ctx.store().read_local(&id).is_ok());
    assert_eq!(ctx.failure(&id), "Data download failed");
    assert!(!ctx.list.contains(&id));
}

#[test]
fn expired_job_without_deleted_retention_is_purged() {
    let mut ctx = setup_with(|c| c.keep_deleted(0));
    let id = failed_job(&ctx, "PREPARING", 1);
    let mut desc = ctx.local(&id);
    desc.lifetime = Some(0);
    ctx.store().write_local(&id, &desc).unwrap();
    ctx.clock.advance(std::time::Duration::from_secs(2));

    ctx.pass();

    assert!(ctx.store().read_status(&id).is_err());
}

#[test]
fn lifetime_longer_than_retention_is_capped() {
    let mut ctx = setup_with(|c| c.keep_finished(100));
    let id = failed_job(&ctx, "PREPARING", 1);
    let mut desc = ctx.local(&id);
    desc.lifetime = Some(10_000);
    ctx.store().write_local(&id, &desc).unwrap();
    let finished_at = ctx.store().status_mtime(&id).unwrap();

    ctx.pass();

    assert_eq!(ctx.local(&id).cleanuptime, Some(finished_at + 100));
    assert_eq!(ctx.state(&id), JobState::Finished);
}

#[test]
fn deleted_job_is_purged_after_retention() {
    let mut ctx = setup_with(|c| c.keep_deleted(100));
    let id = failed_job(&ctx, "PREPARING", 1);
    let now = ctx.clock.epoch_secs();
    let mut desc = ctx.local(&id);
    desc.cleanuptime = Some(now - 50);
    ctx.store().write_local(&id, &desc).unwrap();
    ctx.store().write_status(&id, StatusRecord::new(JobState::Deleted, false)).unwrap();

    ctx.pass();
    assert_eq!(ctx.state(&id), JobState::Deleted);

    ctx.clock.advance(std::time::Duration::from_secs(51 + 600));
    ctx.pass();
    assert!(ctx.store().read_status(&id).is_err());
}

#[test]
fn cancel_mark_on_finished_job_is_consumed() {
    let mut ctx = setup();
    let id = failed_job(&ctx, "INLRMS", 0);
    ctx.store().set_mark(&id, Mark::Cancel).unwrap();

    ctx.pass();
    assert!(!ctx.store().has_mark(&id, Mark::Cancel));
    assert_eq!(ctx.state(&id), JobState::Finished);
    assert!(!ctx.list.contains(&id));

    // Not reloaded once the mark is gone
    assert_eq!(ctx.list.scan_new_marks().unwrap(), 0);
}
