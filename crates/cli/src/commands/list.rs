// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Default command: list jobs, per-state totals and share usage.

use anyhow::Result;
use arex_storage::ControlStore;

use crate::color;
use crate::listing::Snapshot;
use crate::output::{format_time, format_time_ago, now_secs, or_dash, OutputFormat};

#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    pub long: bool,
    pub show_shares: bool,
}

pub fn handle(store: &ControlStore, options: ListOptions, format: OutputFormat) -> Result<()> {
    let snapshot = Snapshot::collect(store)?;

    match format {
        OutputFormat::Json => {
            let mut value = serde_json::json!({
                "jobs": snapshot.jobs,
                "totals": snapshot.totals,
            });
            if options.show_shares {
                value["shares"] = serde_json::to_value(&snapshot.shares)?;
            }
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => print!("{}", render(&snapshot, options, now_secs())),
    }
    Ok(())
}

/// Text rendering of a snapshot.
pub fn render(snapshot: &Snapshot, options: ListOptions, now: u64) -> String {
    let mut out = String::new();
    if snapshot.jobs.is_empty() {
        out.push_str("No jobs\n");
        return out;
    }

    let rows: Vec<(String, String)> = snapshot
        .jobs
        .iter()
        .map(|j| {
            let status = if j.pending { format!("PENDING:{}", j.state) } else { j.state.to_string() };
            (j.id.to_string(), status)
        })
        .collect();
    let id_w = rows.iter().map(|(id, _)| id.len()).max().unwrap_or(0).max(2);
    let st_w = rows.iter().map(|(_, s)| s.len()).max().unwrap_or(0).max(5);

    if options.long {
        out.push_str(&format!(
            "{}  {}  {:<11}  {:<20}  {:<8}  {:<10}  {}\n",
            color::header(&format!("{:<id_w$}", "ID")),
            color::header(&format!("{:<st_w$}", "STATE")),
            color::header("OWNER"),
            color::header("CHANGED"),
            color::header("SHARE"),
            color::header("LOCALID"),
            color::header("DN"),
        ));
    } else {
        out.push_str(&format!(
            "{}  {}  {:>4}  {}\n",
            color::header(&format!("{:<id_w$}", "ID")),
            color::header(&format!("{:<st_w$}", "STATE")),
            color::header("AGE"),
            color::header("DN"),
        ));
    }

    for (job, (id, status)) in snapshot.jobs.iter().zip(&rows) {
        let status = color::status(&format!("{status:<st_w$}"), job.pending);
        if options.long {
            out.push_str(&format!(
                "{id:<id_w$}  {status}  {:<11}  {:<20}  {:<8}  {:<10}  {}\n",
                format!("{}:{}", job.uid, job.gid),
                format_time(job.status_time),
                or_dash(&job.share),
                or_dash(&job.localid),
                or_dash(&job.subject),
            ));
        } else {
            out.push_str(&format!(
                "{id:<id_w$}  {status}  {:>4}  {}\n",
                format_time_ago(job.status_time, now),
                or_dash(&job.subject),
            ));
        }
    }

    out.push('\n');
    out.push_str(&format!("Jobs total: {}\n", snapshot.jobs.len()));
    for (state, total) in snapshot.totals_in_order() {
        if total.pending > 0 {
            out.push_str(&format!(" {state}: {} ({} pending)\n", total.jobs, total.pending));
        } else {
            out.push_str(&format!(" {state}: {}\n", total.jobs));
        }
    }

    if options.show_shares {
        out.push('\n');
        if snapshot.shares.is_empty() {
            out.push_str(&color::muted("No shares staging"));
            out.push('\n');
        } else {
            let share_w = snapshot.shares.keys().map(|s| or_dash(s).len()).max().unwrap_or(0).max(5);
            out.push_str(&format!(
                "{}  {:>9}  {:>9}\n",
                color::header(&format!("{:<share_w$}", "SHARE")),
                color::header("PREPARING"),
                color::header("FINISHING"),
            ));
            for (share, count) in &snapshot.shares {
                out.push_str(&format!(
                    "{:<share_w$}  {:>9}  {:>9}\n",
                    or_dash(share),
                    count.preparing,
                    count.finishing,
                ));
            }
        }
    }
    out
}

#[cfg(test)]
#[path = "list_tests.rs"]
mod tests;
