// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use arex_core::{GmConfig, JobId, JobState, StatusRecord};
use arex_storage::{layout, Bucket, ControlStore, OwnerPolicy};
use fs2::FileExt;
use tempfile::tempdir;

use super::super::{LifecycleError, LOCK_FILE};
use super::{load_config, startup};

fn test_config(dir: &Path) -> GmConfig {
    let mut config = GmConfig::new(dir.join("control"));
    config.session_root = Some(dir.join("session"));
    config
}

#[test]
fn startup_prepares_control_dir_and_writes_pid() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    let daemon = startup(config.clone(), OwnerPolicy::AnyOwner).unwrap();

    for bucket in Bucket::ALL {
        assert!(layout::bucket_dir(&config.control_dir, bucket).is_dir(), "{bucket:?} missing");
    }
    assert!(config.session_root().is_dir());
    let pid = std::fs::read_to_string(daemon.lock_path()).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());
}

#[test]
fn startup_lock_failed_keeps_running_pid() {
    // Simulate a running grid-manager holding the lock
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    std::fs::create_dir_all(&config.control_dir).unwrap();
    let lock_path = config.control_dir.join(LOCK_FILE);
    let held = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .unwrap();
    held.lock_exclusive().unwrap();
    std::fs::write(&lock_path, b"12345\n").unwrap();

    match startup(config, OwnerPolicy::AnyOwner) {
        Err(LifecycleError::LockFailed(_)) => {}
        Err(e) => panic!("expected LockFailed, got: {e}"),
        Ok(_) => panic!("expected LockFailed, but startup succeeded"),
    }

    assert_eq!(std::fs::read_to_string(&lock_path).unwrap(), "12345\n");
}

#[test]
fn interrupted_jobs_are_queued_for_recovery() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let store = ControlStore::with_policy(&config.control_dir, OwnerPolicy::AnyOwner);
    store.ensure_layout().unwrap();
    let running = JobId::new("job-running");
    let waiting = JobId::new("job-new");
    store.write_status(&running, StatusRecord::new(JobState::InLrms, false)).unwrap();
    store.write_status(&waiting, StatusRecord::new(JobState::Accepted, false)).unwrap();

    let daemon = startup(config, OwnerPolicy::AnyOwner).unwrap();

    assert_eq!(store.status_bucket(&running), Some(Bucket::Restarting));
    assert_eq!(store.status_bucket(&waiting), Some(Bucket::Accepting));
    // Nothing is loaded before the first pass
    assert_eq!(daemon.jobs.lock().len(), 0);
}

#[test]
fn control_dir_override_wins_over_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("arex-gm.toml");
    std::fs::write(&path, "control_dir = \"/from/file\"\nwakeup_period = 30\n").unwrap();

    let config = load_config(Some(path.clone()), None).unwrap();
    assert_eq!(config.control_dir, Path::new("/from/file"));
    assert_eq!(config.wakeup_period, 30);

    let config = load_config(Some(path), Some(dir.path().join("ctl"))).unwrap();
    assert_eq!(config.control_dir, dir.path().join("ctl"));
}

#[test]
fn broken_config_is_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("arex-gm.toml");
    std::fs::write(&path, "wakeup_period = \"soon\"\n").unwrap();

    assert!(matches!(load_config(Some(path), None), Err(LifecycleError::Config(_))));
}
