// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Continuation plugins: external commands consulted after a state change.
//!
//! Plugins run synchronously, one after another, each bounded by its own
//! timeout. The engine folds a `fail` action into its failure handling.

use crate::subprocess::HelperCommand;
use arex_core::{JobId, JobState, PluginAction, PluginConfig};
use std::path::Path;
use std::time::Duration;

/// Job facts substituted into plugin command lines.
#[derive(Debug, Clone, Copy)]
pub struct PluginContext<'a> {
    pub id: &'a JobId,
    pub state: JobState,
    pub control_dir: &'a Path,
    pub session_root: &'a Path,
}

/// What one plugin decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginOutcome {
    pub action: PluginAction,
    pub response: String,
}

/// Hooks run on every persisted state change
pub trait ContinuationHooks: Send + Sync {
    /// Outcomes of every plugin bound to `ctx.state`, in configuration order.
    fn run(&self, ctx: &PluginContext<'_>) -> Vec<PluginOutcome>;
}

/// Replace `%I`, `%S`, `%C`, `%R` and `%%` in a plugin command line.
pub fn substitute(command: &str, ctx: &PluginContext<'_>) -> String {
    let mut out = String::with_capacity(command.len());
    let mut chars = command.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('I') => out.push_str(ctx.id.as_str()),
            Some('S') => out.push_str(ctx.state.as_str()),
            Some('C') => out.push_str(&ctx.control_dir.display().to_string()),
            Some('R') => out.push_str(&ctx.session_root.display().to_string()),
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

/// Plugins from the configuration, run through `sh -c`.
#[derive(Debug, Clone, Default)]
pub struct ContinuationPlugins {
    plugins: Vec<PluginConfig>,
}

impl ContinuationPlugins {
    pub fn new(plugins: Vec<PluginConfig>) -> Self {
        Self { plugins }
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    fn run_one(plugin: &PluginConfig, ctx: &PluginContext<'_>) -> PluginOutcome {
        let line = substitute(&plugin.command, ctx);
        let timeout = Duration::from_secs(plugin.timeout_secs);
        match HelperCommand::shell(&line).run_with_timeout(timeout) {
            Ok(out) if out.success() => {
                PluginOutcome { action: plugin.onsuccess, response: out.response().to_string() }
            }
            Ok(out) => {
                let response = if out.response().is_empty() {
                    format!("exit code {}", out.code)
                } else {
                    out.response().to_string()
                };
                PluginOutcome { action: plugin.onfailure, response }
            }
            Err(crate::AdapterError::Timeout { .. }) => PluginOutcome {
                action: plugin.ontimeout,
                response: format!("timeout after {}s", plugin.timeout_secs),
            },
            Err(e) => PluginOutcome { action: PluginAction::Fail, response: e.to_string() },
        }
    }
}

impl ContinuationHooks for ContinuationPlugins {
    fn run(&self, ctx: &PluginContext<'_>) -> Vec<PluginOutcome> {
        self.plugins
            .iter()
            .filter(|p| p.fires_on(ctx.state))
            .map(|p| {
                let outcome = Self::run_one(p, ctx);
                tracing::debug!(
                    job_id = %ctx.id,
                    state = %ctx.state,
                    action = %outcome.action,
                    "continuation plugin finished"
                );
                outcome
            })
            .collect()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{ContinuationHooks, PluginContext, PluginOutcome};
    use arex_core::{JobId, JobState};
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakePluginState {
        calls: Vec<(JobId, JobState)>,
        outcomes: HashMap<JobState, Vec<PluginOutcome>>,
    }

    /// Fake plugin set for testing. States with no configured outcome run
    /// no plugins.
    #[derive(Clone, Default)]
    pub struct FakePlugins {
        inner: Arc<Mutex<FakePluginState>>,
    }

    impl FakePlugins {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn on_state(&self, state: JobState, outcome: PluginOutcome) {
            self.inner.lock().outcomes.entry(state).or_default().push(outcome);
        }

        pub fn calls(&self) -> Vec<(JobId, JobState)> {
            self.inner.lock().calls.clone()
        }
    }

    impl ContinuationHooks for FakePlugins {
        fn run(&self, ctx: &PluginContext<'_>) -> Vec<PluginOutcome> {
            let mut state = self.inner.lock();
            state.calls.push((ctx.id.clone(), ctx.state));
            state.outcomes.get(&ctx.state).cloned().unwrap_or_default()
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakePlugins;

#[cfg(test)]
#[path = "plugins_tests.rs"]
mod tests;
