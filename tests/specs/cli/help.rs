//! CLI help output specs
//!
//! Verify help text displays for all commands.

use crate::prelude::*;

#[test]
fn gm_jobs_help_shows_usage() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("Usage:")
        .stdout_has("--control-dir")
        .stdout_has("--show-shares");
}

#[test]
fn gm_jobs_help_lists_mark_commands() {
    cli().args(&["--help"]).passes().stdout_has("cancel").stdout_has("clean").stdout_has("restart");
}

#[test]
fn mark_commands_need_an_id() {
    cli().args(&["cancel"]).fails().code_is(2).stderr_has("Usage:");
}

#[test]
fn gm_jobs_version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.2");
}
