// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! gm-jobs: inspect a grid-manager control dir and place job marks

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod color;
mod commands;
mod exit_error;
mod listing;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use arex_core::GmConfig;
use arex_storage::{ControlStore, Mark, OwnerPolicy};
use clap::{Parser, Subcommand};

use commands::list::ListOptions;
use exit_error::ExitError;
use output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "gm-jobs", version, about = "Grid-manager job inspection", styles = color::styles())]
struct Cli {
    /// Control directory to inspect, taking precedence over --config
    #[arg(long, env = "AREX_CONTROL_DIR", global = true)]
    control_dir: Option<PathBuf>,

    /// Grid-manager configuration file (TOML)
    #[arg(short, long, env = "AREX_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Show owner, status time, share and LRMS id
    #[arg(short, long)]
    long: bool,

    /// Show per-share staging counts
    #[arg(long)]
    show_shares: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask the grid-manager to cancel jobs
    Cancel { #[arg(required = true)] ids: Vec<String> },
    /// Ask the grid-manager to remove finished jobs
    Clean { #[arg(required = true)] ids: Vec<String> },
    /// Ask the grid-manager to rerun failed jobs
    Restart { #[arg(required = true)] ids: Vec<String> },
}

impl Cli {
    fn control_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.control_dir {
            return Ok(dir.clone());
        }
        match &self.config {
            Some(path) => Ok(GmConfig::load(path)
                .with_context(|| format!("reading {}", path.display()))?
                .control_dir),
            None => Ok(GmConfig::default().control_dir),
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let control_dir = cli.control_dir()?;
    if !control_dir.is_dir() {
        return Err(ExitError::new(2, format!("control dir {} not found", control_dir.display())).into());
    }
    // Administrative view: every job regardless of owner
    let store = ControlStore::with_policy(&control_dir, OwnerPolicy::AnyOwner);
    let format = OutputFormat::from_json_flag(cli.json);

    match &cli.command {
        None => {
            let options = ListOptions { long: cli.long, show_shares: cli.show_shares };
            commands::list::handle(&store, options, format)
        }
        Some(Command::Cancel { ids }) => commands::mark::handle(&store, Mark::Cancel, ids, format),
        Some(Command::Clean { ids }) => commands::mark::handle(&store, Mark::Clean, ids, format),
        Some(Command::Restart { ids }) => commands::mark::handle(&store, Mark::Restart, ids, format),
    }
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<ExitError>() {
            Some(exit) => {
                eprintln!("gm-jobs: {}", exit.message);
                ExitCode::from(exit.code)
            }
            None => {
                eprintln!("gm-jobs: {e:#}");
                ExitCode::FAILURE
            }
        },
    }
}
