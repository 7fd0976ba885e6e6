//! Mark placement specs
//!
//! Verify `gm-jobs cancel|clean|restart` leave marks for the grid-manager.

use crate::prelude::*;

const LOCAL: &str = "subject=/O=Grid/CN=Alice\nlrms=fork\n";

#[test]
fn cancel_places_mark_in_accepting() {
    let control = ControlDir::new();
    control.job("job-1", "INLRMS", LOCAL).job("job-2", "PREPARING", LOCAL);

    cli()
        .control_dir(&control)
        .args(&["cancel", "job-1", "job-2"])
        .passes()
        .stdout_has("cancel requested for job job-1")
        .stdout_has("cancel requested for job job-2");

    assert!(control.has_mark("job-1", "cancel"));
    assert!(control.has_mark("job-2", "cancel"));
}

#[test]
fn clean_and_restart_place_their_marks() {
    let control = ControlDir::new();
    control.job("job-1", "FINISHED", LOCAL);

    cli().control_dir(&control).args(&["restart", "job-1"]).passes();
    cli().control_dir(&control).args(&["clean", "job-1"]).passes();

    assert!(control.has_mark("job-1", "restart"));
    assert!(control.has_mark("job-1", "clean"));
    assert!(!control.has_mark("job-1", "cancel"));
}

#[test]
fn unknown_job_is_reported_but_others_are_marked() {
    let control = ControlDir::new();
    control.job("job-1", "INLRMS", LOCAL);

    cli()
        .control_dir(&control)
        .args(&["cancel", "ghost", "job-1"])
        .fails()
        .code_is(1)
        .stderr_has("job ghost: no such job")
        .stdout_has("cancel requested for job job-1");

    assert!(control.has_mark("job-1", "cancel"));
    assert!(!control.has_mark("ghost", "cancel"));
}

#[test]
fn json_mark_result() {
    let control = ControlDir::new();
    control.job("job-1", "INLRMS", LOCAL);

    let out = cli().control_dir(&control).args(&["--json", "cancel", "job-1"]).passes();
    let value = out.json();

    assert_eq!(value["marked"][0], "job-1");
    assert_eq!(value["skipped"].as_array().map(Vec::len), Some(0));
}
