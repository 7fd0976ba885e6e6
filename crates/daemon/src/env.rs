// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

/// Default configuration file when neither `--config` nor `AREX_CONFIG` is set.
pub const DEFAULT_CONFIG: &str = "/etc/arc/arex-gm.toml";

/// Resolve the configuration file: explicit path > AREX_CONFIG > default.
///
/// Returns `None` when nothing was asked for and the default does not exist,
/// in which case built-in defaults apply.
pub fn config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path);
    }
    if let Ok(path) = std::env::var("AREX_CONFIG") {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    let default = PathBuf::from(DEFAULT_CONFIG);
    default.is_file().then_some(default)
}

/// Control dir override
pub fn control_dir() -> Option<PathBuf> {
    std::env::var("AREX_CONTROL_DIR").ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

/// Log filter, `info` unless RUST_LOG says otherwise.
pub fn log_filter() -> String {
    std::env::var("RUST_LOG").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| "info".to_string())
}
