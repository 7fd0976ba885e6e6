// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn wait_exit(process: &mut OsProcess) -> i32 {
    let started = Instant::now();
    loop {
        if let Some(code) = process.try_exit_code() {
            return code;
        }
        assert!(started.elapsed() < Duration::from_secs(10), "helper never exited");
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[yare::parameterized(
    success = { "exit 0", 0 },
    hard_failure = { "exit 1", 1 },
    retryable = { "exit 4", 4 },
)]
fn spawned_exit_code_is_reported(line: &str, expected: i32) {
    let mut process = HelperCommand::shell(line).spawn().unwrap();
    assert_eq!(wait_exit(&mut process), expected);
}

#[test]
fn spawn_missing_program_fails() {
    let err = HelperCommand::new("/nonexistent/helper").spawn().unwrap_err();
    assert!(matches!(err, AdapterError::Spawn { .. }));
}

#[test]
fn output_is_appended_to_log() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("job.1.errors");
    std::fs::write(&log, "earlier\n").unwrap();

    let mut process =
        HelperCommand::shell("echo out; echo err >&2").log_to(&log).spawn().unwrap();
    assert_eq!(wait_exit(&mut process), 0);

    let content = std::fs::read_to_string(&log).unwrap();
    assert!(content.starts_with("earlier\n"));
    assert!(content.contains("out"));
    assert!(content.contains("err"));
}

#[test]
fn kill_stops_running_helper() {
    let mut process = HelperCommand::shell("sleep 30").spawn().unwrap();
    assert!(process.pid().is_some());
    assert_eq!(process.try_exit_code(), None);
    process.kill();
    // Killed by signal: no exit code of its own
    assert_eq!(process.try_exit_code(), Some(EXIT_LOST));
}

fn wait_gone(pid: u32) {
    let proc_dir = std::path::PathBuf::from(format!("/proc/{pid}"));
    let started = Instant::now();
    while proc_dir.exists() {
        assert!(started.elapsed() < Duration::from_secs(10), "helper {pid} left behind");
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn kill_returns_without_waiting_and_helper_is_reaped() {
    let mut process = HelperCommand::shell("sleep 30").spawn().unwrap();
    let pid = process.pid().unwrap();

    let started = Instant::now();
    process.kill();
    assert!(started.elapsed() < Duration::from_secs(1));

    // Reaped in the background, not left as a zombie
    wait_gone(pid);
    assert_eq!(process.try_exit_code(), Some(EXIT_LOST));
}

#[test]
fn kill_after_exit_keeps_exit_code() {
    let mut process = HelperCommand::shell("exit 4").spawn().unwrap();
    assert_eq!(wait_exit(&mut process), 4);
    process.kill();
    assert_eq!(process.try_exit_code(), Some(4));
}

#[test]
fn dropping_running_helper_reaps_it_on_exit() {
    let process = HelperCommand::shell("sleep 0.2").spawn().unwrap();
    let pid = process.pid().unwrap();
    drop(process);
    wait_gone(pid);
}

#[test]
fn run_with_timeout_captures_output() {
    let out = HelperCommand::shell("echo hello; exit 3")
        .run_with_timeout(Duration::from_secs(10))
        .unwrap();
    assert_eq!(out.code, 3);
    assert!(!out.success());
    assert_eq!(out.response(), "hello");
}

#[test]
fn run_with_timeout_prefers_stdout_then_stderr() {
    let out = HelperCommand::shell("echo oops >&2").run_with_timeout(Duration::from_secs(10)).unwrap();
    assert!(out.success());
    assert_eq!(out.response(), "oops");
}

#[test]
fn run_with_timeout_kills_slow_helper() {
    let started = Instant::now();
    let err = HelperCommand::shell("sleep 30")
        .run_with_timeout(Duration::from_millis(100))
        .unwrap_err();
    assert!(matches!(err, AdapterError::Timeout { .. }));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn env_is_passed_to_helper() {
    let out = HelperCommand::shell("echo $AREX_JOB")
        .env("AREX_JOB", "j42")
        .run_with_timeout(Duration::from_secs(10))
        .unwrap();
    assert_eq!(out.stdout, "j42");
}
