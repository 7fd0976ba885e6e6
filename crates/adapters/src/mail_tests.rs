// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::{Duration, Instant};

#[yare::parameterized(
    default_flags_finished = { "a@x", JobState::Finished, &["a@x"] },
    default_flags_preparing = { "a@x", JobState::Preparing, &["a@x"] },
    default_flags_skip_inlrms = { "a@x", JobState::InLrms, &[] },
    explicit_flags = { "q a@x", JobState::InLrms, &["a@x"] },
    flags_apply_forward = { "a@x e b@y", JobState::Finished, &["a@x", "b@y"] },
    flags_change = { "q a@x e b@y", JobState::InLrms, &["a@x"] },
    cancel_flag = { "c a@x", JobState::Canceling, &["a@x"] },
    duplicates_once = { "a@x be a@x", JobState::Finished, &["a@x"] },
    no_addresses = { "abc", JobState::Accepted, &[] },
    undefined_never = { "a@x", JobState::Undefined, &[] },
)]
fn recipients_by_flag(notify: &str, state: JobState, expected: &[&str]) {
    assert_eq!(recipients(notify, state), expected);
}

#[test]
fn command_carries_state_and_addresses() {
    let mailer = CommandMailer::new("/usr/libexec/arc/smtp-send.sh");
    let id = JobId::new("j1");
    let to = vec!["a@x".to_string(), "b@y".to_string()];
    let cmd = mailer.command(&MailMessage {
        id: &id,
        state: JobState::Finished,
        jobname: "sim",
        failure: "",
        recipients: &to,
    });
    let args: Vec<&str> = cmd.arg_list().iter().filter_map(|a| a.to_str()).collect();
    assert_eq!(args, vec!["j1", "FINISHED", "a@x", "b@y"]);
}

#[test]
fn send_without_recipients_spawns_nothing() {
    let mailer = CommandMailer::new("/nonexistent/mailer");
    let id = JobId::new("j1");
    let msg =
        MailMessage { id: &id, state: JobState::Finished, jobname: "", failure: "", recipients: &[] };
    assert!(mailer.send(&msg).is_ok());
    assert_eq!(mailer.inflight(), 0);
}

#[test]
fn send_runs_mail_command_in_background() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("mail.out");
    let script = dir.path().join("mailer.sh");
    std::fs::write(&script, format!("echo \"$@ $AREX_FAILURE\" > {}\n", out.display())).unwrap();

    // Run the script through sh so it needs no exec bit
    let mailer = CommandMailer::new("/bin/sh");
    let id = JobId::new(script.display().to_string());
    let to = vec!["a@x".to_string()];
    mailer
        .send(&MailMessage {
            id: &id,
            state: JobState::Finished,
            jobname: "sim",
            failure: "LRMS error",
            recipients: &to,
        })
        .unwrap();

    let started = Instant::now();
    while mailer.inflight() > 0 {
        assert!(started.elapsed() < Duration::from_secs(10));
        std::thread::sleep(Duration::from_millis(10));
    }
    let content = std::fs::read_to_string(&out).unwrap();
    assert_eq!(content.trim(), "FINISHED a@x LRMS error");
}

#[test]
fn fake_records_mail() {
    let fake = FakeMailer::new();
    let id = JobId::new("j1");
    let to = vec!["a@x".to_string()];
    fake.send(&MailMessage {
        id: &id,
        state: JobState::Accepted,
        jobname: "",
        failure: "",
        recipients: &to,
    })
    .unwrap();
    assert_eq!(fake.calls()[0].recipients, to);
}
