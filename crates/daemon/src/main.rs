// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! arex-gm: grid-manager daemon

use std::path::PathBuf;

use anyhow::{Context, Result};
use arex_daemon::{lifecycle, logging, scheduler};
use arex_storage::OwnerPolicy;
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "arex-gm", version, about = "A-REX grid-manager job state engine")]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "AREX_CONFIG")]
    config: Option<PathBuf>,

    /// Control directory, overriding the configuration
    #[arg(long, env = "AREX_CONTROL_DIR")]
    control_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = lifecycle::load_config(args.config, args.control_dir)?;
    let _guard = logging::init(config.log_dir.as_deref());

    let mut daemon = lifecycle::startup(config, OwnerPolicy::service())
        .context("grid-manager failed to start")?;

    let mut sigterm = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("installing SIGINT handler")?;
    let shutdown = async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
            _ = sigint.recv() => info!("Received SIGINT, shutting down"),
        }
    };

    let outcome = scheduler::run(&mut daemon, shutdown).await;
    if let Err(e) = &outcome {
        error!(error = %e, "scheduler stopped");
    }
    daemon.shutdown()?;
    outcome.map_err(Into::into)
}
