// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing setup for the grid-manager process.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// File name prefix of the rolling daemon log.
pub const LOG_FILE: &str = "arex-gm.log";

/// Install the global subscriber: stderr always, plus a daily rolling file
/// when `log_dir` is set.
///
/// The returned guard flushes the file writer and must live until exit.
pub fn init(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_new(crate::env::log_filter()).unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr = tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // A subscriber may already be installed (tests); keep it
    let _ = tracing_subscriber::registry().with(filter).with(stderr).with(file).try_init();

    guard
}
