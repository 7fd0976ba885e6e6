// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;
use std::time::Duration;

use arex_core::{GmConfig, JobId, JobState, LocalDescription, StatusRecord};
use arex_storage::{ControlStore, OwnerPolicy};
use tempfile::tempdir;

use super::{pass, run};
use crate::lifecycle::{startup, DaemonState};

fn daemon_with_job(dir: &Path) -> (DaemonState, JobId) {
    let mut config = GmConfig::new(dir.join("control"));
    config.session_root = Some(dir.join("session"));
    let store = ControlStore::with_policy(&config.control_dir, OwnerPolicy::AnyOwner);
    store.ensure_layout().unwrap();
    let id = JobId::new("job-1");
    store.write_local(&id, &LocalDescription::default()).unwrap();
    store.write_status(&id, StatusRecord::new(JobState::Accepted, false)).unwrap();
    (startup(config, OwnerPolicy::AnyOwner).unwrap(), id)
}

#[tokio::test]
async fn first_pass_runs_immediately() {
    let dir = tempdir().unwrap();
    let (mut daemon, id) = daemon_with_job(dir.path());

    run(&mut daemon, tokio::time::sleep(Duration::from_millis(200))).await.unwrap();

    assert!(daemon.jobs.lock().contains(&id));
    daemon.shutdown().unwrap();
}

#[tokio::test]
async fn pending_shutdown_skips_the_pass() {
    let dir = tempdir().unwrap();
    let (mut daemon, _) = daemon_with_job(dir.path());

    run(&mut daemon, std::future::ready(())).await.unwrap();

    assert_eq!(daemon.jobs.lock().len(), 0);
    daemon.shutdown().unwrap();
}

#[tokio::test]
async fn manual_pass_loads_new_jobs() {
    let dir = tempdir().unwrap();
    let (mut daemon, id) = daemon_with_job(dir.path());

    pass(&mut daemon).await.unwrap();

    let jobs = daemon.jobs.lock();
    assert_eq!(jobs.get(&id).map(|j| j.state), Some(JobState::Accepted));
}
