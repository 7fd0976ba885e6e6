// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use arex_core::{JobState, StatusRecord};
use arex_storage::OwnerPolicy;
use tempfile::TempDir;
use yare::parameterized;

fn store_with(ids: &[&str]) -> (TempDir, ControlStore) {
    let dir = TempDir::new().unwrap();
    let store = ControlStore::with_policy(dir.path(), OwnerPolicy::AnyOwner);
    store.ensure_layout().unwrap();
    for id in ids {
        store.write_status(&JobId::new(*id), StatusRecord::new(JobState::InLrms, false)).unwrap();
    }
    (dir, store)
}

#[parameterized(
    cancel = { Mark::Cancel },
    clean = { Mark::Clean },
    restart = { Mark::Restart },
)]
fn known_jobs_are_marked(mark: Mark) {
    let (_dir, store) = store_with(&["job-1", "job-2"]);

    let result = place(&store, mark, &["job-1".to_string(), "job-2".to_string()]).unwrap();

    assert_eq!(result.marked, vec!["job-1", "job-2"]);
    assert!(result.skipped.is_empty());
    assert!(store.has_mark(&JobId::new("job-1"), mark));
    assert!(store.has_mark(&JobId::new("job-2"), mark));
}

#[test]
fn unknown_and_malformed_ids_are_skipped() {
    let (_dir, store) = store_with(&["job-1"]);

    let ids = vec!["ghost".to_string(), "../etc".to_string(), "job-1".to_string()];
    let result = place(&store, Mark::Cancel, &ids).unwrap();

    assert_eq!(result.marked, vec!["job-1"]);
    assert_eq!(
        result.skipped,
        vec![
            ("ghost".to_string(), "no such job".to_string()),
            ("../etc".to_string(), "invalid job id".to_string()),
        ]
    );
    assert!(!store.has_mark(&JobId::new("ghost"), Mark::Cancel));
}

#[test]
fn skipped_ids_set_the_exit_code() {
    let (_dir, store) = store_with(&[]);

    let err = handle(&store, Mark::Clean, &["ghost".to_string()], OutputFormat::Json).unwrap_err();

    let exit = err.downcast_ref::<ExitError>().unwrap();
    assert_eq!(exit.code, 1);
}

#[test]
fn marking_twice_is_harmless() {
    let (_dir, store) = store_with(&["job-1"]);

    place(&store, Mark::Restart, &["job-1".to_string()]).unwrap();
    let result = place(&store, Mark::Restart, &["job-1".to_string()]).unwrap();

    assert_eq!(result.marked, vec!["job-1"]);
}
