// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! arex-engine: grid-manager job state engine

pub mod admission;
pub mod backoff;
pub mod counters;
mod error;
pub mod job_log;
mod jobs;

pub use admission::{AdmissionPolicy, Allocation, ShareDemand};
pub use counters::{JobCounters, Slot};
pub use error::{HandlerResult, JobFailure, Next, PassSummary};
pub use job_log::JobLog;
pub use jobs::{Collaborators, JobsList, CHILD_RUN_TIME_SUSPICIOUS, CHILD_RUN_TIME_TOO_LONG};
