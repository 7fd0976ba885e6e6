// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job list and its scheduling pass.
//!
//! [`JobsList`] owns every job record held in memory. One call to
//! [`JobsList::act_jobs`] runs each job's state handler, lets it cascade
//! through as many states as it can this pass, and funnels every outcome
//! through one epilogue that persists the status, fires the state-change side
//! effects and turns failures into transitions toward FINISHING.
//!
//! Handlers live in sibling modules as further `impl Engine` blocks, one file
//! per phase of the job life cycle.

mod events;
mod failure;
mod finished;
mod intake;
mod lrms;
mod recovery;
mod staging;

use crate::admission::Allocation;
use crate::counters::{JobCounters, Slot};
use crate::error::{HandlerResult, Next, PassSummary};
use crate::job_log::JobLog;
use arex_adapters::{
    CommandMailer, ContinuationHooks, ContinuationPlugins, HelperStager, LrmsAdapter,
    MailNotifier, ScriptLrms, Stager,
};
use arex_core::{Clock, GmConfig, GmJob, JobId, JobState, Owner, StatusRecord};
use arex_storage::{ControlStore, FinishedCursor, StorageError};
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Past this a running helper gets a side-channel check for lost exits.
pub const CHILD_RUN_TIME_SUSPICIOUS: Duration = Duration::from_secs(10 * 60);
/// Past this a running helper is declared failed.
pub const CHILD_RUN_TIME_TOO_LONG: Duration = Duration::from_secs(60 * 60);

/// Upper bound on state changes for one job in one pass.
const MAX_CASCADE: usize = 16;

/// External collaborators the engine delegates to.
#[derive(Clone)]
pub struct Collaborators {
    pub lrms: Arc<dyn LrmsAdapter>,
    pub stager: Arc<dyn Stager>,
    pub plugins: Arc<dyn ContinuationHooks>,
    pub mailer: Arc<dyn MailNotifier>,
}

impl Collaborators {
    /// Process-backed collaborators built from the configuration.
    pub fn from_config(config: &GmConfig) -> Self {
        Self {
            lrms: Arc::new(ScriptLrms::new(config.helpers.clone())),
            stager: Arc::new(HelperStager::new(config.helpers.clone())),
            plugins: Arc::new(ContinuationPlugins::new(config.plugins.clone())),
            mailer: Arc::new(CommandMailer::new(config.helpers.mail())),
        }
    }
}

/// What one poll of a job's helper process observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HelperPoll {
    /// No helper attached.
    Idle,
    Running,
    /// Still running past [`CHILD_RUN_TIME_SUSPICIOUS`].
    Suspicious,
    /// Still running past [`CHILD_RUN_TIME_TOO_LONG`]; already killed.
    TimedOut,
    Exited(i32),
}

/// Per-job outcome of one pass.
#[derive(Debug, Default)]
struct Acted {
    dropped: bool,
    changed: bool,
    internal: bool,
}

/// In-memory job collection plus the engine that drives it.
pub struct JobsList<C: Clock> {
    jobs: IndexMap<JobId, GmJob>,
    engine: Engine<C>,
    finished_cursor: Option<FinishedCursor>,
    next_finished_sweep: u64,
}

/// Everything a handler may touch besides the job itself.
///
/// Kept apart from the job map so a handler can borrow one job mutably while
/// using the store, counters and collaborators.
struct Engine<C: Clock> {
    config: GmConfig,
    store: ControlStore,
    deps: Collaborators,
    clock: C,
    counters: JobCounters,
    allocation: Allocation,
    /// Submit and cancel helpers currently running.
    scripts: u32,
    job_log: JobLog,
    rng: StdRng,
    passes: u64,
}

impl<C: Clock> JobsList<C> {
    pub fn new(config: GmConfig, store: ControlStore, deps: Collaborators, clock: C) -> Self {
        let job_log = JobLog::new(config.joblog.clone(), store.logs_dir());
        Self {
            jobs: IndexMap::new(),
            engine: Engine {
                config,
                store,
                deps,
                clock,
                counters: JobCounters::default(),
                allocation: Allocation::unlimited(),
                scripts: 0,
                job_log,
                rng: StdRng::from_entropy(),
                passes: 0,
            },
            finished_cursor: None,
            next_finished_sweep: 0,
        }
    }

    /// Fix the backoff jitter source.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.engine.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &GmConfig {
        &self.engine.config
    }

    pub fn store(&self) -> &ControlStore {
        &self.engine.store
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn get(&self, id: &JobId) -> Option<&GmJob> {
        self.jobs.get(id)
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.jobs.contains_key(id)
    }

    pub fn jobs(&self) -> impl Iterator<Item = &GmJob> {
        self.jobs.values()
    }

    pub fn counters(&self) -> &JobCounters {
        &self.engine.counters
    }

    /// Staging allocation computed at the start of the last pass.
    pub fn allocation(&self) -> &Allocation {
        &self.engine.allocation
    }

    /// Start tracking a job in UNDEFINED. Returns false if already known.
    pub fn add_job(&mut self, id: JobId, owner: Owner) -> bool {
        if self.jobs.contains_key(&id) {
            return false;
        }
        let mut job = GmJob::new(id.clone(), owner, JobState::Undefined);
        job.retries = self.engine.config.max_retries;
        job.keep_finished = self.engine.config.keep_finished;
        job.keep_deleted = self.engine.config.keep_deleted;
        self.engine.counters.add(&Slot::of(&job));
        tracing::debug!(job_id = %id, owner = %owner, "job added");
        self.jobs.insert(id, job);
        true
    }

    /// Run one scheduling pass over every job in memory.
    pub fn act_jobs(&mut self) -> PassSummary {
        let engine = &mut self.engine;
        engine.begin_pass(&self.jobs);
        let mut summary = PassSummary::default();
        self.jobs.retain(|_, job| {
            let acted = engine.act_job(job);
            summary.processed += 1;
            summary.changed += usize::from(acted.changed);
            summary.failed += usize::from(acted.internal);
            summary.dropped += usize::from(acted.dropped);
            !acted.dropped
        });
        tracing::debug!(
            processed = summary.processed,
            changed = summary.changed,
            dropped = summary.dropped,
            failed = summary.failed,
            "pass complete"
        );
        summary
    }

    /// Kill every running helper. Used on shutdown.
    pub fn release_helpers(&mut self) {
        for job in self.jobs.values_mut() {
            if job.child.is_some() {
                tracing::info!(job_id = %job.id, state = %job.state, "killing helper on shutdown");
                job.release_child();
            }
        }
        self.engine.scripts = 0;
    }
}

impl<C: Clock> Engine<C> {
    fn begin_pass(&mut self, jobs: &IndexMap<JobId, GmJob>) {
        self.passes += 1;
        self.counters = JobCounters::recount(jobs.values());
        self.scripts = jobs
            .values()
            .filter(|j| j.child.is_some() && matches!(j.state, JobState::Submitting | JobState::Canceling))
            .count() as u32;
        self.allocation = self.compute_allocation(jobs);
    }

    /// Handle one job until it waits, is dropped or stops cascading.
    fn act_job(&mut self, job: &mut GmJob) -> Acted {
        let initial = job.state;
        let mut persisted = StatusRecord::new(job.state, job.pending);
        let mut acted = Acted::default();
        let mut next = Next::Wait;

        for _ in 0..MAX_CASCADE {
            let before = Slot::of(job);
            let step = match self.dispatch(job) {
                Ok(next) => Ok(next),
                Err(failure) => {
                    if let Some(reason) = failure.reason() {
                        job.add_failure(reason);
                    }
                    self.act_job_failed(job)
                }
            };
            next = match step.and_then(|next| self.persist(job, &mut persisted, next)) {
                Ok(next) => next,
                Err(e) => {
                    self.internal_failure(job, &e);
                    acted.internal = true;
                    Next::Drop
                }
            };
            if job.state == JobState::Deleted {
                next = Next::Drop;
            }
            self.counters.moved(&before, &Slot::of(job));
            if next != Next::Reprocess {
                break;
            }
        }
        if next == Next::Reprocess {
            tracing::warn!(job_id = %job.id, state = %job.state, "state cascade limit reached");
        }

        acted.changed = persisted.state != initial;
        if next == Next::Drop {
            self.counters.remove(&Slot::of(job));
            self.release_child(job);
            tracing::debug!(job_id = %job.id, state = %job.state, "job dropped from memory");
            acted.dropped = true;
        }
        acted
    }

    fn dispatch(&mut self, job: &mut GmJob) -> HandlerResult {
        if self.cancel_requested(job) {
            return self.cancel_job(job);
        }
        match job.state {
            JobState::Undefined => self.state_undefined(job),
            JobState::Accepted => self.state_accepted(job),
            JobState::Preparing => self.state_preparing(job),
            JobState::Submitting => self.state_submitting(job),
            JobState::InLrms => self.state_inlrms(job),
            JobState::Canceling => self.state_canceling(job),
            JobState::Finishing => self.state_finishing(job),
            JobState::Finished => self.state_finished(job),
            JobState::Deleted => self.state_deleted(job),
        }
    }

    /// Write the status if it changed and fire the state-change side effects.
    fn persist(
        &mut self,
        job: &mut GmJob,
        persisted: &mut StatusRecord,
        next: Next,
    ) -> Result<Next, StorageError> {
        if next == Next::Drop {
            return Ok(next);
        }
        let current = StatusRecord::new(job.state, job.pending);
        if current == *persisted {
            return Ok(next);
        }
        let from = persisted.state;
        if from == JobState::Undefined {
            // Just loaded: the status on disk is already current
            *persisted = current;
            if job.state == JobState::Accepted {
                return self.state_changed(job, from, next);
            }
            return Ok(next);
        }
        if let Err(e) = self.store.write_status(&job.id, current) {
            tracing::error!(job_id = %job.id, state = %job.state, error = %e, "failed writing job status");
            job.add_failure(&format!("Failed writing job status: {e}"));
            return self.act_job_failed(job);
        }
        *persisted = current;
        if from != job.state {
            return self.state_changed(job, from, next);
        }
        Ok(next)
    }

    fn now(&self) -> u64 {
        self.clock.epoch_secs()
    }

    fn session_dir(&self, job: &GmJob) -> PathBuf {
        job.session_dir
            .clone()
            .unwrap_or_else(|| self.config.session_root().join(job.id.as_str()))
    }

    /// Mark the job pending, logging the reason the first time.
    fn set_pending(&self, job: &mut GmJob, reason: &str) {
        if !job.pending {
            tracing::info!(job_id = %job.id, state = %job.state, reason, "job pending");
            self.store.append_errors(&job.id, job.state, &format!("Pending: {reason}"));
            job.pending = true;
        }
    }

    fn poll_helper(&mut self, job: &mut GmJob) -> HelperPoll {
        let now = self.clock.now();
        let Some(child) = job.child.as_mut() else {
            return HelperPoll::Idle;
        };
        if let Some(code) = child.poll(now) {
            return HelperPoll::Exited(code);
        }
        let running = child.running_for(now);
        if running > CHILD_RUN_TIME_TOO_LONG {
            tracing::error!(job_id = %job.id, state = %job.state, ?running, "helper runs too long");
            self.release_child(job);
            HelperPoll::TimedOut
        } else if running > CHILD_RUN_TIME_SUSPICIOUS {
            HelperPoll::Suspicious
        } else {
            HelperPoll::Running
        }
    }

    /// Drop the job's helper, killing it if still running.
    fn release_child(&mut self, job: &mut GmJob) {
        if job.child.is_some() && matches!(job.state, JobState::Submitting | JobState::Canceling) {
            self.scripts = self.scripts.saturating_sub(1);
        }
        job.release_child();
    }
}

#[cfg(test)]
#[path = "jobs_tests/mod.rs"]
mod tests;
