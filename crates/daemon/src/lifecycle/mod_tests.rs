// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use arex_core::GmConfig;
use arex_storage::OwnerPolicy;
use tempfile::tempdir;

use super::startup;

#[test]
fn shutdown_removes_pid_and_releases_lock() {
    let dir = tempdir().unwrap();
    let mut config = GmConfig::new(dir.path().join("control"));
    config.session_root = Some(dir.path().join("session"));

    let mut daemon = startup(config.clone(), OwnerPolicy::AnyOwner).unwrap();
    let lock_path = daemon.lock_path().to_path_buf();
    daemon.shutdown().unwrap();
    drop(daemon);

    assert!(!lock_path.exists());
    // A second grid-manager can take over the control dir
    let mut next = startup(config, OwnerPolicy::AnyOwner).unwrap();
    next.shutdown().unwrap();
}

#[test]
fn side_processes_are_started_on_poll() {
    let dir = tempdir().unwrap();
    let mut config = GmConfig::new(dir.path().join("control"));
    config.session_root = Some(dir.path().join("session"));
    config.helpers.long_running = vec!["sleep 30".to_string()];

    let mut daemon = startup(config, OwnerPolicy::AnyOwner).unwrap();
    assert_eq!(daemon.helpers.running(), 0);

    daemon.poll_side_processes();
    assert_eq!(daemon.helpers.running(), 1);

    daemon.shutdown().unwrap();
    assert_eq!(daemon.helpers.running(), 0);
}
