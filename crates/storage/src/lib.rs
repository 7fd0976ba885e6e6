// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! arex-storage: control-file persistence for grid-manager jobs

mod cleanup;
mod error;
pub mod layout;
mod scan;
mod store;

pub use error::StorageError;
pub use layout::{Bucket, ControlFile, Mark};
pub use scan::{FinishedBatch, FinishedCursor, JobEntry, OwnerPolicy};
pub use store::{ControlStore, LrmsResult, TransferList, STAGEIN_DONE};
