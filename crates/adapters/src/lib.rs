// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! arex-adapters: external helpers the grid-manager delegates to

mod error;
pub mod lrms;
pub mod mail;
pub mod plugins;
pub mod stager;
pub mod subprocess;
pub mod supervisor;

pub use error::AdapterError;
pub use lrms::{LrmsAdapter, LrmsRequest, ScriptLrms};
pub use mail::{recipients, CommandMailer, MailMessage, MailNotifier};
pub use plugins::{ContinuationHooks, ContinuationPlugins, PluginContext, PluginOutcome};
pub use stager::{Direction, HelperStager, StageRequest, Stager, TransferExit, EXIT_RETRYABLE};
pub use subprocess::{HelperCommand, HelperOutput, OsProcess};
pub use supervisor::{HelperSupervisor, Reporter};

#[cfg(any(test, feature = "test-support"))]
pub use lrms::{FakeLrms, LrmsCall};
#[cfg(any(test, feature = "test-support"))]
pub use mail::{FakeMailer, MailCall};
#[cfg(any(test, feature = "test-support"))]
pub use plugins::FakePlugins;
#[cfg(any(test, feature = "test-support"))]
pub use stager::{FakeStager, StageCall};
