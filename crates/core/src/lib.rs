// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! arex-core: job model shared by the grid-manager crates

pub mod macros;

pub mod clock;
pub mod config;
pub mod id;
pub mod job;
pub mod local;
pub mod process;
pub mod state;
pub mod time_fmt;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{
    ConfigError, FinishedScanConfig, GmConfig, HelpersConfig, Limit, PluginAction, PluginConfig,
};
pub use id::is_valid_job_id;
#[cfg(any(test, feature = "test-support"))]
pub use job::GmJobBuilder;
pub use job::{GmJob, JobId, Owner};
pub use local::{FileData, LocalDescription, ParseError};
pub use process::{ChildHandle, HelperProcess, EXIT_LOST};
pub use state::{JobState, StatusRecord};
pub use time_fmt::{format_elapsed, format_epoch, format_utc_now};
