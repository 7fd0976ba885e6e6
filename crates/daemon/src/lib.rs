// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! arex-daemon: the grid-manager process
//!
//! Owns the control dir lock, drives scheduling passes on a fixed period and
//! supervises the side processes configured next to the job flow.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod env;
pub mod lifecycle;
pub mod logging;
pub mod scheduler;

pub use lifecycle::{load_config, startup, DaemonState, LifecycleError};
