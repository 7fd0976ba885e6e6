//! Job listing specs
//!
//! Verify `gm-jobs` reads every bucket of a control dir.

use crate::prelude::*;

const ALICE: &str = "subject=/O=Grid/CN=Alice\nlrms=fork\ntransfershare=atlas\n";
const BOB: &str = "subject=/O=Grid/CN=Bob\nlrms=fork\ntransfershare=cms\n";

#[test]
fn empty_control_dir_lists_no_jobs() {
    let control = ControlDir::new();
    cli().control_dir(&control).passes().stdout_has("No jobs");
}

#[test]
fn missing_control_dir_is_an_error() {
    let control = ControlDir::new();
    let missing = control.root().join("nowhere");
    cli()
        .args(&["--control-dir", missing.to_str().unwrap()])
        .fails()
        .code_is(2)
        .stderr_has("not found");
}

#[test]
fn jobs_in_every_bucket_are_listed_with_totals() {
    let control = ControlDir::new();
    control
        .job("job-a", "ACCEPTED", ALICE)
        .job("job-b", "PENDING:ACCEPTED", BOB)
        .job("job-c", "INLRMS", ALICE)
        .job("job-d", "FINISHED", BOB);

    cli()
        .control_dir(&control)
        .passes()
        .stdout_has("job-a")
        .stdout_has("PENDING:ACCEPTED")
        .stdout_has("/O=Grid/CN=Alice")
        .stdout_has("Jobs total: 4")
        .stdout_has(" ACCEPTED: 2 (1 pending)")
        .stdout_has(" INLRMS: 1")
        .stdout_has(" FINISHED: 1")
        .stdout_lacks("SHARE");
}

#[test]
fn show_shares_counts_active_staging() {
    let control = ControlDir::new();
    control
        .job("job-1", "PREPARING", ALICE)
        .job("job-2", "FINISHING", ALICE)
        .job("job-3", "PENDING:PREPARING", BOB);

    cli()
        .control_dir(&control)
        .args(&["--show-shares"])
        .passes()
        .stdout_has("SHARE  PREPARING  FINISHING")
        .stdout_has("atlas")
        .stdout_lacks("cms ");
}

#[test]
fn json_listing_is_machine_readable() {
    let control = ControlDir::new();
    control.job("job-1", "PREPARING", ALICE).job("job-2", "INLRMS", BOB);

    let out = cli().control_dir(&control).args(&["--json", "--show-shares"]).passes();
    let value = out.json();

    let jobs = value["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0]["id"], "job-1");
    assert_eq!(jobs[0]["state"], "PREPARING");
    assert_eq!(jobs[0]["bucket"], "processing");
    assert_eq!(jobs[1]["subject"], "/O=Grid/CN=Bob");
    assert_eq!(value["totals"]["INLRMS"]["jobs"], 1);
    assert_eq!(value["shares"]["atlas"]["preparing"], 1);
}

#[test]
fn config_file_supplies_the_control_dir() {
    let control = ControlDir::new();
    control.job("job-1", "INLRMS", ALICE);
    let config = control.config_file();

    cli().args(&["--config", config.to_str().unwrap()]).passes().stdout_has("job-1");
}

#[test]
fn long_listing_shows_owner_uid() {
    let control = ControlDir::new();
    control.job("job-1", "INLRMS", ALICE);

    cli().control_dir(&control).args(&["--long"]).passes().stdout_has("OWNER").stdout_has("atlas");
}
