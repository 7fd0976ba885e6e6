// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job list tests: whole jobs driven through passes against a temp control
//! dir with recording fakes for every collaborator.

mod cancel;
mod failures;
mod finished;
mod lifecycle;
mod limits;
mod recovery;
mod retries;

use super::*;
use arex_adapters::{Direction, FakeLrms, FakeMailer, FakePlugins, FakeStager};
use arex_core::{FakeClock, FileData, LocalDescription, Limit};
use arex_storage::{Bucket, ControlFile, LrmsResult, Mark, OwnerPolicy, TransferList};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::TempDir;

struct TestContext {
    dir: TempDir,
    list: JobsList<FakeClock>,
    clock: FakeClock,
    lrms: FakeLrms,
    stager: FakeStager,
    plugins: FakePlugins,
    mailer: FakeMailer,
}

fn setup() -> TestContext {
    setup_with(|c| c)
}

/// Context whose config is adjusted by `configure`.
fn setup_with(configure: impl FnOnce(GmConfig) -> GmConfig) -> TestContext {
    let dir = TempDir::new().unwrap();
    let mut config = configure(GmConfig::new(dir.path().join("control")));
    config.session_root = Some(dir.path().join("session"));
    std::fs::create_dir_all(dir.path().join("session")).unwrap();

    let store = ControlStore::with_policy(&config.control_dir, OwnerPolicy::AnyOwner);
    store.ensure_layout().unwrap();

    // Cleanup times derive from status file mtimes, so the fake epoch starts
    // at real time
    let clock = FakeClock::new();
    clock.set_epoch_secs(SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs());

    let lrms = FakeLrms::new();
    let stager = FakeStager::new();
    let plugins = FakePlugins::new();
    let mailer = FakeMailer::new();
    let deps = Collaborators {
        lrms: Arc::new(lrms.clone()),
        stager: Arc::new(stager.clone()),
        plugins: Arc::new(plugins.clone()),
        mailer: Arc::new(mailer.clone()),
    };
    let list = JobsList::new(config, store, deps, clock.clone()).with_seed(7);
    TestContext { dir, list, clock, lrms, stager, plugins, mailer }
}

/// Local description of a job running `/bin/true` for `/CN=Alice`.
fn local() -> LocalDescription {
    LocalDescription {
        subject: "/CN=Alice".to_string(),
        jobname: "test".to_string(),
        lrms: "fork".to_string(),
        args: vec!["/bin/true".to_string()],
        ..Default::default()
    }
}

fn remote(name: &str) -> FileData {
    FileData::new(name, format!("gsiftp://storage.example.org/{name}"))
}

impl TestContext {
    fn store(&self) -> &ControlStore {
        self.list.store()
    }

    /// Place a freshly accepted job in the control dir.
    fn submit(&self, id: &str, local: LocalDescription) -> JobId {
        let id = JobId::new(id);
        let store = self.store();
        store.write_list(&id, TransferList::Input, &local.inputs).unwrap();
        store.write_list(&id, TransferList::Output, &local.outputs).unwrap();
        store.write_local(&id, &local).unwrap();
        store.write_status(&id, StatusRecord::new(JobState::Accepted, false)).unwrap();
        id
    }

    fn pass(&mut self) -> PassSummary {
        self.list.tick()
    }

    fn passes(&mut self, n: usize) {
        for _ in 0..n {
            self.pass();
        }
    }

    /// Persisted status of a job.
    fn status(&self, id: &JobId) -> StatusRecord {
        self.store().read_status(id).unwrap()
    }

    fn state(&self, id: &JobId) -> JobState {
        self.status(id).state
    }

    /// Submit helper recorded the LRMS id.
    fn assign_local_id(&self, id: &JobId, localid: &str) {
        let path = self.store().control_path(id, ControlFile::Grami);
        let mut content = std::fs::read_to_string(&path).unwrap_or_default();
        content.push_str(&format!("joboption_jobid={localid}\n"));
        std::fs::write(path, content).unwrap();
    }

    /// Scan helper saw the job finish in the LRMS.
    fn lrms_finished(&self, id: &JobId, code: i32) {
        let result = LrmsResult { code, description: "Job finished".to_string() };
        self.store().set_lrms_done(id, &result).unwrap();
    }

    /// Drive a freshly submitted job to INLRMS.
    fn run_to_inlrms(&mut self, id: &JobId) {
        self.passes(2);
        assert_eq!(self.state(id), JobState::Submitting);
        self.assign_local_id(id, "4242");
        self.pass();
        assert_eq!(self.state(id), JobState::InLrms);
    }

    fn failure(&self, id: &JobId) -> String {
        self.store().read_failure(id).unwrap_or_default()
    }

    fn local(&self, id: &JobId) -> LocalDescription {
        self.store().read_local(id).unwrap()
    }

    fn session_root(&self) -> std::path::PathBuf {
        self.dir.path().join("session")
    }
}
