// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    accepted = { JobState::Accepted, Bucket::Accepting },
    preparing = { JobState::Preparing, Bucket::Processing },
    inlrms = { JobState::InLrms, Bucket::Processing },
    canceling = { JobState::Canceling, Bucket::Processing },
    finished = { JobState::Finished, Bucket::Finished },
    deleted = { JobState::Deleted, Bucket::Finished },
)]
fn bucket_for_state(state: JobState, bucket: Bucket) {
    assert_eq!(Bucket::for_state(state), bucket);
}

#[yare::parameterized(
    status = { "job.abc.status", "abc", "status" },
    dotted_id = { "job.a.b.cancel", "a.b", "cancel" },
    suffix_with_underscore = { "job.x1.output_status", "x1", "output_status" },
)]
fn parse_valid_file_names(name: &str, id: &str, suffix: &str) {
    let (parsed_id, parsed_suffix) = parse_file_name(name).unwrap();
    assert_eq!(parsed_id, id);
    assert_eq!(parsed_suffix, suffix);
}

#[yare::parameterized(
    no_prefix = { "abc.status" },
    no_suffix = { "job.abc" },
    empty_id = { "job..status" },
)]
fn reject_invalid_file_names(name: &str) {
    assert!(parse_file_name(name).is_none());
}

#[test]
fn file_name_round_trips() {
    let id = JobId::new("1234");
    for file in ControlFile::ALL {
        let name = file_name(&id, file.as_str());
        let (parsed, suffix) = parse_file_name(&name).unwrap();
        assert_eq!(parsed, id);
        assert_eq!(ControlFile::from_name(suffix), Some(file));
    }
}

#[test]
fn marks_are_distinct_from_status() {
    for mark in Mark::ALL {
        assert_ne!(mark.as_str(), STATUS_SUFFIX);
        assert_eq!(Mark::from_name(mark.as_str()), Some(mark));
    }
}
