// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Grid-manager configuration loaded from TOML.

use crate::state::JobState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("plugin for unknown state {0:?}")]
    UnknownState(String),
    #[error("{0} must be at least 1")]
    TooSmall(&'static str),
}

/// A cap that may be switched off. Written as an integer in TOML, `-1` meaning
/// unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Limit {
    #[default]
    Unlimited,
    Max(u32),
}

impl Limit {
    /// True when one more job fits beside `current`.
    pub fn allows(self, current: u32) -> bool {
        match self {
            Limit::Unlimited => true,
            Limit::Max(max) => current < max,
        }
    }

    pub fn get(self) -> Option<u32> {
        match self {
            Limit::Unlimited => None,
            Limit::Max(max) => Some(max),
        }
    }

    pub fn is_unlimited(self) -> bool {
        matches!(self, Limit::Unlimited)
    }
}

impl From<i64> for Limit {
    fn from(v: i64) -> Self {
        if v < 0 {
            Limit::Unlimited
        } else {
            Limit::Max(u32::try_from(v).unwrap_or(u32::MAX))
        }
    }
}

impl From<Limit> for i64 {
    fn from(limit: Limit) -> Self {
        match limit {
            Limit::Unlimited => -1,
            Limit::Max(max) => i64::from(max),
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Unlimited => f.write_str("unlimited"),
            Limit::Max(max) => write!(f, "{max}"),
        }
    }
}

/// What a continuation plugin's outcome does to the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginAction {
    Pass,
    Log,
    Fail,
}

crate::named_enum! {
    PluginAction {
        Pass => "pass",
        Log => "log",
        Fail => "fail",
    }
}

/// A continuation plugin bound to one or more states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginConfig {
    /// State names (`ACCEPTED`, `FINISHED`, ...) the plugin fires on.
    pub states: Vec<String>,
    /// Command line; `%I`, `%S`, `%C`, `%R` are substituted.
    pub command: String,
    #[serde(default = "default_plugin_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_onsuccess")]
    pub onsuccess: PluginAction,
    #[serde(default = "default_onfailure")]
    pub onfailure: PluginAction,
    #[serde(default = "default_onfailure")]
    pub ontimeout: PluginAction,
}

impl PluginConfig {
    pub fn fires_on(&self, state: JobState) -> bool {
        self.states.iter().any(|s| JobState::from_name(s) == Some(state))
    }
}

fn default_plugin_timeout() -> u64 {
    10
}

fn default_onsuccess() -> PluginAction {
    PluginAction::Pass
}

fn default_onfailure() -> PluginAction {
    PluginAction::Fail
}

/// Budget for one incremental sweep of the `finished` bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinishedScanConfig {
    pub max_jobs: u32,
    pub max_time_ms: u64,
    /// Seconds between the end of one full sweep and the start of the next.
    pub period: u64,
}

impl Default for FinishedScanConfig {
    fn default() -> Self {
        Self { max_jobs: 100, max_time_ms: 200, period: 600 }
    }
}

/// External helper commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelpersConfig {
    /// Directory holding `submit-<lrms>-job`, `cancel-<lrms>-job` and friends.
    pub libexec_dir: PathBuf,
    pub default_lrms: String,
    /// Configuration file passed to LRMS helpers.
    pub config_file: Option<PathBuf>,
    pub downloader: Option<PathBuf>,
    pub uploader: Option<PathBuf>,
    /// Long-running side processes (LRMS scanners), restarted when they exit.
    pub long_running: Vec<String>,
    pub reporter: Option<String>,
    pub reporter_interval: u64,
    pub mail: Option<PathBuf>,
}

impl Default for HelpersConfig {
    fn default() -> Self {
        Self {
            libexec_dir: PathBuf::from("/usr/libexec/arc"),
            default_lrms: "fork".to_string(),
            config_file: None,
            downloader: None,
            uploader: None,
            long_running: Vec::new(),
            reporter: None,
            reporter_interval: 3600,
            mail: None,
        }
    }
}

impl HelpersConfig {
    pub fn downloader(&self) -> PathBuf {
        self.downloader.clone().unwrap_or_else(|| self.libexec_dir.join("downloader"))
    }

    pub fn uploader(&self) -> PathBuf {
        self.uploader.clone().unwrap_or_else(|| self.libexec_dir.join("uploader"))
    }

    pub fn mail(&self) -> PathBuf {
        self.mail.clone().unwrap_or_else(|| self.libexec_dir.join("smtp-send.sh"))
    }

    /// `<libexec>/<action>-<lrms>-job`, e.g. `submit-slurm-job`.
    pub fn lrms_script(&self, action: &str, lrms: &str) -> PathBuf {
        let lrms = if lrms.is_empty() { self.default_lrms.as_str() } else { lrms };
        self.libexec_dir.join(format!("{action}-{lrms}-job"))
    }
}

/// Complete grid-manager configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GmConfig {
    pub control_dir: PathBuf,
    pub session_root: Option<PathBuf>,
    pub max_jobs: Limit,
    pub max_jobs_running: Limit,
    /// Global cap on PREPARING + FINISHING.
    pub max_jobs_staging: Limit,
    pub max_jobs_per_dn: Limit,
    pub max_jobs_per_share: Limit,
    /// Shares with reserved staging slots.
    pub privileged_shares: BTreeMap<String, u32>,
    /// Concurrent submit/cancel helpers.
    pub max_scripts: Limit,
    pub max_retries: u32,
    pub retry_base_secs: u64,
    pub keep_finished: u64,
    pub keep_deleted: u64,
    pub wakeup_period: u64,
    pub finished_scan: FinishedScanConfig,
    pub helpers: HelpersConfig,
    pub plugins: Vec<PluginConfig>,
    pub cache_dirs: Vec<PathBuf>,
    /// Directory for the daemon's own rolling log.
    pub log_dir: Option<PathBuf>,
    /// Accounting log with Started/Finished lines.
    pub joblog: Option<PathBuf>,
}

impl Default for GmConfig {
    fn default() -> Self {
        Self {
            control_dir: PathBuf::from("/var/spool/arc/jobstatus"),
            session_root: None,
            max_jobs: Limit::Unlimited,
            max_jobs_running: Limit::Unlimited,
            max_jobs_staging: Limit::Max(10),
            max_jobs_per_dn: Limit::Unlimited,
            max_jobs_per_share: Limit::Unlimited,
            privileged_shares: BTreeMap::new(),
            max_scripts: Limit::Unlimited,
            max_retries: 10,
            retry_base_secs: 10,
            keep_finished: 7 * 24 * 3600,
            keep_deleted: 30 * 24 * 3600,
            wakeup_period: 120,
            finished_scan: FinishedScanConfig::default(),
            helpers: HelpersConfig::default(),
            plugins: Vec::new(),
            cache_dirs: Vec::new(),
            log_dir: None,
            joblog: None,
        }
    }
}

impl GmConfig {
    /// Default configuration rooted at `control_dir`.
    pub fn new(control_dir: impl Into<PathBuf>) -> Self {
        Self { control_dir: control_dir.into(), ..Self::default() }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: GmConfig = toml::from_str(content)?;
        for plugin in &config.plugins {
            if let Some(bad) = plugin.states.iter().find(|s| JobState::from_name(s).is_none()) {
                return Err(ConfigError::UnknownState(bad.clone()));
            }
        }
        if config.finished_scan.max_jobs == 0 {
            return Err(ConfigError::TooSmall("finished_scan.max_jobs"));
        }
        Ok(config)
    }

    /// Session root, defaulting to a `session` sibling of the control dir.
    pub fn session_root(&self) -> PathBuf {
        self.session_root.clone().unwrap_or_else(|| {
            self.control_dir.parent().unwrap_or(&self.control_dir).join("session")
        })
    }

    /// Reserved slots for a privileged share, if it is one.
    pub fn reserved_slots(&self, share: &str) -> Option<u32> {
        self.privileged_shares.get(share).copied()
    }

    crate::setters! {
        into {
            control_dir: PathBuf,
            privileged_shares: BTreeMap<String, u32>,
            plugins: Vec<PluginConfig>,
        }
        set {
            max_jobs: Limit,
            max_jobs_running: Limit,
            max_jobs_staging: Limit,
            max_jobs_per_dn: Limit,
            max_jobs_per_share: Limit,
            max_scripts: Limit,
            max_retries: u32,
            retry_base_secs: u64,
            keep_finished: u64,
            keep_deleted: u64,
            helpers: HelpersConfig,
            finished_scan: FinishedScanConfig,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
