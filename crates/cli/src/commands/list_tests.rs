// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::listing::{JobRow, ShareCount, StateTotal};
use arex_core::JobId;

const NOW: u64 = 1_700_000_000;

fn row(id: &str, state: &'static str, pending: bool, share: &str) -> JobRow {
    JobRow {
        id: JobId::new(id),
        state,
        pending,
        bucket: "processing",
        uid: 1000,
        gid: 100,
        subject: "/O=Grid/CN=Alice".to_string(),
        share: share.to_string(),
        lrms: "fork".to_string(),
        localid: String::new(),
        status_time: NOW - 120,
    }
}

fn snapshot() -> Snapshot {
    let mut snapshot = Snapshot::default();
    snapshot.jobs = vec![row("job-1", "PREPARING", false, "atlas"), row("job-2", "ACCEPTED", true, "")];
    snapshot.totals.insert("ACCEPTED", StateTotal { jobs: 1, pending: 1 });
    snapshot.totals.insert("PREPARING", StateTotal { jobs: 1, pending: 0 });
    snapshot.shares.insert("atlas".to_string(), ShareCount { preparing: 1, finishing: 0 });
    snapshot
}

fn plain() -> bool {
    !std::env::var("COLOR").is_ok_and(|v| v == "1")
}

#[test]
fn empty_listing() {
    assert_eq!(render(&Snapshot::default(), ListOptions::default(), NOW), "No jobs\n");
}

#[test]
fn short_listing_shows_age_and_totals() {
    if !plain() {
        return;
    }
    let out = render(&snapshot(), ListOptions::default(), NOW);

    assert!(out.contains("job-1  PREPARING "), "{out}");
    assert!(out.contains("  2m  /O=Grid/CN=Alice\n"), "{out}");
    assert!(out.contains("job-2  PENDING:ACCEPTED"), "{out}");
    assert!(out.contains("Jobs total: 2\n"));
    // Pipeline order, pending noted
    let accepted = out.find(" ACCEPTED: 1 (1 pending)").unwrap();
    let preparing = out.find(" PREPARING: 1\n").unwrap();
    assert!(accepted < preparing);
    assert!(!out.contains("SHARE"));
}

#[test]
fn long_listing_shows_owner_and_share() {
    if !plain() {
        return;
    }
    let out = render(&snapshot(), ListOptions { long: true, show_shares: false }, NOW);

    assert!(out.contains("OWNER"));
    assert!(out.contains("1000:100"));
    assert!(out.contains("atlas"));
    assert!(out.contains("2023-11-14T22:11:20Z"), "{out}");
}

#[test]
fn share_table_is_opt_in() {
    if !plain() {
        return;
    }
    let out = render(&snapshot(), ListOptions { long: false, show_shares: true }, NOW);

    assert!(out.contains("SHARE  PREPARING  FINISHING"), "{out}");
    assert!(out.contains(&format!("atlas  {:>9}  {:>9}\n", 1, 0)), "{out}");
}
