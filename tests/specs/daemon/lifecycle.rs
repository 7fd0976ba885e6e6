//! Daemon lifecycle specs
//!
//! Verify `arex-gm` start/stop and the control dir lock.

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use crate::prelude::*;

fn spawn_daemon(config: &Path) -> Child {
    Command::new(assert_cmd::cargo::cargo_bin("arex-gm"))
        .args(["--config", config.to_str().unwrap()])
        .env_remove("AREX_CONTROL_DIR")
        .env("RUST_LOG", "info")
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap()
}

fn wait_for(what: &str, mut check: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !check() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(50));
    }
}

fn terminate(child: &mut Child) {
    let status = Command::new("kill").args(["-TERM", &child.id().to_string()]).status().unwrap();
    assert!(status.success());
}

#[test]
fn daemon_writes_pid_and_cleans_up_on_sigterm() {
    let control = ControlDir::new();
    let config = control.config_file();
    let pid_file = control.path().join("gm.pid");

    let mut daemon = spawn_daemon(&config);
    wait_for("pid file", || {
        std::fs::read_to_string(&pid_file).is_ok_and(|pid| pid.trim() == daemon.id().to_string())
    });

    terminate(&mut daemon);
    let mut status = None;
    wait_for("daemon exit", || {
        status = daemon.try_wait().unwrap();
        status.is_some()
    });

    assert!(status.is_some_and(|s| s.success()));
    assert!(!pid_file.exists());
}

#[test]
fn second_daemon_on_same_control_dir_is_refused() {
    let control = ControlDir::new();
    let config = control.config_file();
    let pid_file = control.path().join("gm.pid");

    let mut first = spawn_daemon(&config);
    wait_for("pid file", || std::fs::read_to_string(&pid_file).is_ok_and(|p| !p.trim().is_empty()));

    let second = spawn_daemon(&config).wait_with_output().unwrap();
    assert!(!second.status.success());
    assert!(String::from_utf8_lossy(&second.stderr).contains("already running"));
    // The running daemon keeps its PID
    assert_eq!(std::fs::read_to_string(&pid_file).unwrap().trim(), first.id().to_string());

    terminate(&mut first);
    first.wait().unwrap();
}
