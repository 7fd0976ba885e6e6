// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

// Tests run without a TTY and with COLOR unset, so every helper is plain.

#[test]
fn helpers_pass_text_through_without_a_terminal() {
    if std::env::var("COLOR").is_ok_and(|v| v == "1") {
        return;
    }
    assert_eq!(header("ID"), "ID");
    assert_eq!(muted("-"), "-");
    assert_eq!(status("PENDING:ACCEPTED", true), "PENDING:ACCEPTED");
}

#[test]
fn status_of_a_running_job_is_never_painted() {
    assert_eq!(status("INLRMS", false), "INLRMS");
}
