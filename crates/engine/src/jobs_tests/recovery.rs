// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn interrupted_job_resumes_after_restart() {
    let mut ctx = setup_with(|c| c.max_retries(4));
    let mut desc = local();
    desc.inputs = vec![remote("in.dat")];
    let id = ctx.submit("job-1", desc);
    ctx.store().write_status(&id, StatusRecord::new(JobState::Preparing, false)).unwrap();

    assert_eq!(ctx.list.restart_jobs().unwrap(), 1);
    assert_eq!(ctx.store().status_bucket(&id), Some(Bucket::Restarting));

    ctx.pass();
    let job = ctx.list.get(&id).unwrap();
    assert_eq!(job.state, JobState::Preparing);
    assert_eq!(job.retries, 4);
    assert_eq!(ctx.store().status_bucket(&id), Some(Bucket::Processing));
    assert!(ctx.stager.calls().is_empty());

    ctx.pass();
    assert_eq!(ctx.stager.count(Direction::Download), 1);
}

#[test]
fn recovered_jobs_load_oldest_first() {
    let mut ctx = setup();
    let old = ctx.submit("zz-old", local());
    let new = ctx.submit("aa-new", local());
    for (id, secs_ago) in [(&old, 300), (&new, 100)] {
        ctx.store().write_status(id, StatusRecord::new(JobState::InLrms, false)).unwrap();
        let when = SystemTime::now() - std::time::Duration::from_secs(secs_ago);
        std::fs::File::options()
            .write(true)
            .open(ctx.store().status_path(Bucket::Processing, id))
            .unwrap()
            .set_modified(when)
            .unwrap();
    }

    assert_eq!(ctx.list.restart_jobs().unwrap(), 2);
    assert_eq!(ctx.list.scan_new_jobs().unwrap(), 2);

    let order: Vec<&str> = ctx.list.jobs().map(|j| j.id.as_str()).collect();
    assert_eq!(order, vec!["zz-old", "aa-new"]);
}

#[test]
fn restart_with_empty_processing_moves_nothing() {
    let mut ctx = setup();
    ctx.submit("job-1", local());

    assert_eq!(ctx.list.restart_jobs().unwrap(), 0);
    assert_eq!(ctx.store().status_bucket(&JobId::new("job-1")), Some(Bucket::Accepting));
}

#[test]
fn submitted_job_is_not_resubmitted_after_restart() {
    let mut ctx = setup();
    let id = ctx.submit("job-1", local());
    ctx.store().write_status(&id, StatusRecord::new(JobState::Submitting, false)).unwrap();
    ctx.store().write_grami(&id, &local(), &ctx.session_root().join("job-1")).unwrap();
    ctx.assign_local_id(&id, "99");
    ctx.list.restart_jobs().unwrap();

    ctx.passes(2);

    assert!(ctx.lrms.calls().is_empty());
    assert_eq!(ctx.state(&id), JobState::InLrms);
    assert_eq!(ctx.local(&id).localid, "99");
}

#[test]
fn marks_of_vanished_jobs_are_removed() {
    let mut ctx = setup();
    let ghost = JobId::new("ghost");
    ctx.store().set_mark(&ghost, Mark::Cancel).unwrap();
    ctx.store().set_mark(&ghost, Mark::Clean).unwrap();

    ctx.pass();

    assert!(!ctx.store().has_mark(&ghost, Mark::Cancel));
    assert!(!ctx.store().has_mark(&ghost, Mark::Clean));
    assert!(ctx.list.is_empty());
}

#[test]
fn finished_sweep_visits_old_jobs_once_per_period() {
    let mut ctx = setup();
    let id = ctx.submit("job-1", local());
    ctx.store().write_status(&id, StatusRecord::new(JobState::Finished, false)).unwrap();

    let summary = ctx.pass();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.dropped, 1);
    assert!(!ctx.list.contains(&id));
    // Retention has not expired
    assert_eq!(ctx.state(&id), JobState::Finished);
    assert!(ctx.local(&id).cleanuptime.is_some());

    let summary = ctx.pass();
    assert_eq!(summary.processed, 0);

    ctx.clock.advance(std::time::Duration::from_secs(601));
    let summary = ctx.pass();
    assert_eq!(summary.processed, 1);
}

#[test]
fn finished_sweep_respects_batch_size() {
    let mut ctx = setup_with(|mut c| {
        c.finished_scan.max_jobs = 2;
        c
    });
    for n in 0..5 {
        let id = ctx.submit(&format!("job-{n}"), local());
        ctx.store().write_status(&id, StatusRecord::new(JobState::Finished, false)).unwrap();
    }

    let visited: Vec<usize> = (0..4).map(|_| ctx.pass().processed).collect();

    assert_eq!(visited, vec![2, 2, 1, 0]);
}
