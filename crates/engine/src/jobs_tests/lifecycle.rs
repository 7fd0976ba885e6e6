// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Jobs running start to finish

use super::*;

#[test]
fn job_without_files_runs_to_finished_without_staging() {
    let mut ctx = setup();
    let id = ctx.submit("job-1", local());

    ctx.pass();
    assert_eq!(ctx.state(&id), JobState::Accepted);
    assert!(ctx.list.contains(&id));

    ctx.pass();
    assert_eq!(ctx.state(&id), JobState::Submitting);
    assert_eq!(ctx.lrms.calls(), vec![arex_adapters::LrmsCall::Submit(id.clone())]);

    ctx.assign_local_id(&id, "4242");
    ctx.pass();
    assert_eq!(ctx.state(&id), JobState::InLrms);
    assert_eq!(ctx.local(&id).localid, "4242");

    ctx.lrms_finished(&id, 0);
    ctx.pass();
    assert_eq!(ctx.state(&id), JobState::Finished);
    assert!(ctx.stager.calls().is_empty());
    assert!(ctx.failure(&id).is_empty());
    // Finished jobs leave memory
    assert!(!ctx.list.contains(&id));
}

#[test]
fn loading_waits_a_pass_before_admission() {
    let mut ctx = setup();
    let id = ctx.submit("job-1", local());

    let summary = ctx.pass();

    assert_eq!(summary.processed, 1);
    assert_eq!(ctx.list.get(&id).map(|j| j.state), Some(JobState::Accepted));
    assert!(!ctx.status(&id).pending);
    assert!(ctx.lrms.calls().is_empty());
}

#[test]
fn staging_only_job_skips_the_lrms() {
    let mut ctx = setup();
    let mut desc = local();
    desc.args.clear();
    desc.inputs = vec![remote("in.dat")];
    desc.outputs = vec![remote("out.dat")];
    let id = ctx.submit("job-1", desc);

    ctx.passes(2);
    assert_eq!(ctx.state(&id), JobState::Preparing);
    assert_eq!(ctx.stager.count(Direction::Download), 1);

    // Download done, straight to FINISHING which starts the upload
    ctx.pass();
    assert_eq!(ctx.state(&id), JobState::Finishing);
    assert_eq!(ctx.stager.count(Direction::Upload), 1);
    assert!(ctx.store().read_list(&id, TransferList::Input).unwrap().is_empty());

    ctx.pass();
    assert_eq!(ctx.state(&id), JobState::Finished);
    assert!(ctx.lrms.calls().is_empty());
    assert!(ctx.store().read_list(&id, TransferList::Output).unwrap().is_empty());
}

#[test]
fn outputs_without_destination_survive_upload() {
    let mut ctx = setup();
    let mut desc = local();
    desc.outputs = vec![remote("out.dat"), FileData::new("stdout", "")];
    let id = ctx.submit("job-1", desc);
    ctx.run_to_inlrms(&id);

    ctx.lrms_finished(&id, 0);
    ctx.pass();
    assert_eq!(ctx.state(&id), JobState::Finishing);
    ctx.pass();

    assert_eq!(ctx.state(&id), JobState::Finished);
    let kept = ctx.store().read_list(&id, TransferList::Output).unwrap();
    assert_eq!(kept, vec![FileData::new("stdout", "")]);
}

#[test]
fn finishing_writes_accounting_and_job_log() {
    let mut ctx = setup();
    let joblog = ctx.dir.path().join("joblog");
    ctx.list.engine.job_log = JobLog::new(Some(joblog.clone()), ctx.store().logs_dir());
    let id = ctx.submit("job-1", local());

    ctx.run_to_inlrms(&id);
    ctx.lrms_finished(&id, 0);
    ctx.pass();

    let logs = ctx.store().logs_dir();
    assert!(logs.join("job-1.accepted").is_file());
    let record = std::fs::read_to_string(logs.join("job-1.finished")).unwrap();
    assert!(record.contains("status=completed"));
    assert!(record.contains("localid=4242"));
    let lines = std::fs::read_to_string(joblog).unwrap();
    assert!(lines.contains("Started - job id: job-1"));
    assert!(lines.contains("Finished - job id: job-1"));
}

#[test]
fn state_changes_are_logged_per_job() {
    let mut ctx = setup();
    let id = ctx.submit("job-1", local());
    ctx.passes(2);

    let errors =
        std::fs::read_to_string(ctx.store().control_path(&id, ControlFile::Errors)).unwrap();
    assert!(errors.contains("[PREPARING] State changed from ACCEPTED"));
    assert!(errors.contains("[SUBMIT] State changed from PREPARING"));
}

#[test]
fn plugins_run_once_per_persisted_change() {
    let mut ctx = setup();
    let id = ctx.submit("job-1", local());
    ctx.passes(2);

    let states: Vec<JobState> = ctx.plugins.calls().into_iter().map(|(_, s)| s).collect();
    assert_eq!(
        states,
        vec![JobState::Accepted, JobState::Preparing, JobState::Submitting]
    );
    assert!(ctx.plugins.calls().iter().all(|(job, _)| *job == id));
}

#[test]
fn helpers_get_a_session_dir_under_the_session_root() {
    let mut ctx = setup();
    let id = ctx.submit("job-1", local());
    ctx.passes(2);

    let job = ctx.list.get(&id).unwrap();
    assert_eq!(job.session_dir, Some(ctx.session_root().join("job-1")));
    let grami =
        std::fs::read_to_string(ctx.store().control_path(&id, ControlFile::Grami)).unwrap();
    let session = ctx.session_root().join("job-1");
    assert!(grami.contains(&format!("joboption_directory={}", session.display())));
}
