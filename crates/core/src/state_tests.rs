// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    accepted = { "ACCEPTED", JobState::Accepted },
    preparing = { "PREPARING", JobState::Preparing },
    submit = { "SUBMIT", JobState::Submitting },
    submitting_alias = { "SUBMITTING", JobState::Submitting },
    inlrms = { "INLRMS", JobState::InLrms },
    canceling = { "CANCELING", JobState::Canceling },
    finishing = { "FINISHING", JobState::Finishing },
    finished = { "FINISHED", JobState::Finished },
    deleted = { "DELETED", JobState::Deleted },
)]
fn state_from_name(name: &str, state: JobState) {
    assert_eq!(JobState::from_name(name), Some(state));
}

#[test]
fn state_names_round_trip() {
    for state in JobState::ALL {
        assert_eq!(JobState::from_name(state.as_str()), Some(state));
        assert_eq!(JobState::ALL[state.index()], state);
    }
}

#[test]
fn unknown_state_name_rejected() {
    assert_eq!(JobState::from_name("RUNNING"), None);
    assert_eq!(JobState::from_name("accepted"), None);
}

#[test]
fn active_range_covers_pipeline_only() {
    let active: Vec<_> = JobState::ALL.into_iter().filter(|s| s.is_active()).collect();
    assert_eq!(
        active,
        vec![
            JobState::Preparing,
            JobState::Submitting,
            JobState::InLrms,
            JobState::Canceling,
            JobState::Finishing
        ]
    );
    assert!(JobState::Accepted.is_tracked());
    assert!(!JobState::Accepted.is_active());
    assert!(!JobState::Finished.is_tracked());
}

#[yare::parameterized(
    plain = { "INLRMS", JobState::InLrms, false },
    pending = { "PENDING:ACCEPTED", JobState::Accepted, true },
    trailing_newline = { "FINISHED\n", JobState::Finished, false },
)]
fn status_record_parse(content: &str, state: JobState, pending: bool) {
    assert_eq!(StatusRecord::parse(content), Some(StatusRecord::new(state, pending)));
}

#[test]
fn status_record_rejects_garbage() {
    assert_eq!(StatusRecord::parse(""), None);
    assert_eq!(StatusRecord::parse("PENDING:"), None);
    assert_eq!(StatusRecord::parse("BOGUS"), None);
}

#[test]
fn status_record_display() {
    assert_eq!(StatusRecord::new(JobState::Submitting, false).to_string(), "SUBMIT");
    assert_eq!(StatusRecord::new(JobState::InLrms, true).to_string(), "PENDING:INLRMS");
}

#[test]
fn every_persisted_state_has_a_shortcut() {
    for state in JobState::ALL {
        assert_eq!(state.shortcut().is_some(), state != JobState::Undefined);
    }
}
