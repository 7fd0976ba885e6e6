// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn slot(state: JobState, pending: bool, subject: &str, share: &str) -> Slot {
    Slot { state, pending, subject: subject.to_string(), share: share.to_string() }
}

#[test]
fn pending_jobs_are_tracked_but_not_staging() {
    let mut c = JobCounters::default();
    c.add(&slot(JobState::Preparing, true, "/CN=a", "s"));
    c.add(&slot(JobState::Preparing, false, "/CN=a", "s"));
    assert_eq!(c.in_state(JobState::Preparing), 1);
    assert_eq!(c.pending_in(JobState::Preparing), 1);
    assert_eq!(c.tracked(), 2);
    assert_eq!(c.staging(), 1);
    assert_eq!(c.share_occupancy(Direction::Download, "s"), 1);
}

#[test]
fn per_dn_covers_preparing_through_finishing() {
    let mut c = JobCounters::default();
    for state in JobState::ALL {
        c.add(&slot(state, false, "/CN=a", ""));
    }
    // PREPARING SUBMITTING INLRMS CANCELING FINISHING
    assert_eq!(c.per_dn("/CN=a"), 5);
    assert_eq!(c.per_dn("/CN=b"), 0);
}

#[test]
fn moving_a_job_updates_every_view() {
    let mut c = JobCounters::default();
    let before = slot(JobState::Accepted, false, "/CN=a", "s");
    c.add(&before);
    let after = slot(JobState::Preparing, false, "/CN=a", "s");
    c.moved(&before, &after);
    assert_eq!(c.in_state(JobState::Accepted), 0);
    assert_eq!(c.in_state(JobState::Preparing), 1);
    assert_eq!(c.per_dn("/CN=a"), 1);
    assert_eq!(c.share_occupancy(Direction::Download, "s"), 1);

    let done = slot(JobState::Finished, false, "/CN=a", "s");
    c.moved(&after, &done);
    assert_eq!(c.per_dn("/CN=a"), 0);
    assert!(c.dn_counts().is_empty());
    assert!(c.share_map(Direction::Download).is_empty());
}

#[test]
fn remove_never_underflows() {
    let mut c = JobCounters::default();
    c.remove(&slot(JobState::InLrms, false, "/CN=a", ""));
    assert_eq!(c.in_state(JobState::InLrms), 0);
    assert_eq!(c, JobCounters::default());
}

#[test]
fn running_counts_submitting_and_inlrms() {
    let mut c = JobCounters::default();
    c.add(&slot(JobState::Submitting, false, "", ""));
    c.add(&slot(JobState::InLrms, false, "", ""));
    c.add(&slot(JobState::InLrms, true, "", ""));
    c.add(&slot(JobState::Canceling, false, "", ""));
    assert_eq!(c.running(), 2);
}

#[test]
fn recount_matches_incremental_adds() {
    let jobs = vec![
        GmJob::builder().id("a").state(JobState::Preparing).transfer_share("x").build(),
        GmJob::builder().id("b").state(JobState::Finishing).transfer_share("y").build(),
        GmJob::builder().id("c").state(JobState::Accepted).pending(true).build(),
    ];
    let counters = JobCounters::recount(&jobs);
    let mut manual = JobCounters::default();
    for job in &jobs {
        manual.add(&Slot::of(job));
    }
    assert_eq!(counters, manual);
    assert_eq!(counters.share_occupancy(Direction::Upload, "y"), 1);
    assert_eq!(counters.tracked(), 3);
}
