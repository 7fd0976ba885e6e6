// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cancel`, `clean` and `restart`: place marks for the grid-manager.

use anyhow::Result;
use arex_core::{is_valid_job_id, JobId};
use arex_storage::{ControlStore, Mark};
use serde::Serialize;

use crate::exit_error::ExitError;
use crate::output::OutputFormat;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkResult {
    pub marked: Vec<String>,
    /// Ids that were rejected, with the reason.
    pub skipped: Vec<(String, String)>,
}

/// Mark every known job; unknown or malformed ids are reported, not fatal.
pub fn place(store: &ControlStore, mark: Mark, ids: &[String]) -> Result<MarkResult> {
    let mut result = MarkResult { marked: Vec::new(), skipped: Vec::new() };
    for raw in ids {
        if !is_valid_job_id(raw) {
            result.skipped.push((raw.clone(), "invalid job id".to_string()));
            continue;
        }
        let id = JobId::new(raw.as_str());
        if store.status_bucket(&id).is_none() {
            result.skipped.push((raw.clone(), "no such job".to_string()));
            continue;
        }
        store.set_mark(&id, mark)?;
        result.marked.push(raw.clone());
    }
    Ok(result)
}

pub fn handle(store: &ControlStore, mark: Mark, ids: &[String], format: OutputFormat) -> Result<()> {
    let result = place(store, mark, ids)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => {
            for id in &result.marked {
                println!("{} requested for job {}", mark, id);
            }
            for (id, reason) in &result.skipped {
                eprintln!("job {}: {}", id, reason);
            }
        }
    }

    if !result.skipped.is_empty() {
        return Err(ExitError::new(1, format!("{} job(s) not marked", result.skipped.len())).into());
    }
    Ok(())
}

#[cfg(test)]
#[path = "mark_tests.rs"]
mod tests;
