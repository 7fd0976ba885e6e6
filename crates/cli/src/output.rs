// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use arex_core::{format_elapsed, format_epoch};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Format a timestamp as relative time (e.g., "5s", "2m", "1h", "3d")
pub fn format_time_ago(epoch_secs: u64, now_secs: u64) -> String {
    if epoch_secs == 0 {
        return "-".to_string();
    }
    format_elapsed(now_secs.saturating_sub(epoch_secs))
}

/// Absolute UTC time for `--long` listings.
pub fn format_time(epoch_secs: u64) -> String {
    if epoch_secs == 0 {
        return "-".to_string();
    }
    format_epoch(epoch_secs)
}

/// Placeholder for empty columns.
pub fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

pub fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
