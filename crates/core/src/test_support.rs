// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::process::{HelperProcess, EXIT_LOST};
use parking_lot::Mutex;
use std::sync::Arc;

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core types.
pub mod strategies {
    use crate::state::JobState;
    use proptest::prelude::*;

    pub fn arb_job_state() -> impl Strategy<Value = JobState> {
        (0..JobState::ALL.len()).prop_map(|i| JobState::ALL[i])
    }

    /// Share names drawn from a small alphabet so collisions are common.
    pub fn arb_share() -> impl Strategy<Value = String> {
        prop_oneof![Just(String::new()), "[a-d]"]
    }
}

// ── Scripted helper process ─────────────────────────────────────────────

struct ScriptedState {
    polls_left: Option<u32>,
    code: i32,
    killed: bool,
    polls: u32,
}

/// Helper process whose exit is controlled by the test.
///
/// Clones share state, so the test keeps one clone to observe or steer the
/// process after handing another to the engine.
#[derive(Clone)]
pub struct ScriptedProcess {
    inner: Arc<Mutex<ScriptedState>>,
}

impl ScriptedProcess {
    /// Exits with `code` once it has been polled `polls` times without exiting.
    pub fn exits_after(polls: u32, code: i32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ScriptedState {
                polls_left: Some(polls),
                code,
                killed: false,
                polls: 0,
            })),
        }
    }

    pub fn never_exits() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ScriptedState {
                polls_left: None,
                code: 0,
                killed: false,
                polls: 0,
            })),
        }
    }

    /// Make the next poll report exit with `code`.
    pub fn finish(&self, code: i32) {
        let mut state = self.inner.lock();
        state.polls_left = Some(0);
        state.code = code;
    }

    pub fn was_killed(&self) -> bool {
        self.inner.lock().killed
    }

    pub fn polls(&self) -> u32 {
        self.inner.lock().polls
    }
}

impl HelperProcess for ScriptedProcess {
    fn try_exit_code(&mut self) -> Option<i32> {
        let mut state = self.inner.lock();
        state.polls += 1;
        if state.killed {
            return Some(EXIT_LOST);
        }
        match state.polls_left {
            Some(0) => Some(state.code),
            Some(left) => {
                state.polls_left = Some(left - 1);
                None
            }
            None => None,
        }
    }

    fn kill(&mut self) {
        self.inner.lock().killed = true;
    }
}
