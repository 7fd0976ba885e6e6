// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    unlimited = { -1, Limit::Unlimited },
    any_negative = { -7, Limit::Unlimited },
    zero = { 0, Limit::Max(0) },
    some = { 25, Limit::Max(25) },
)]
fn limit_from_integer(raw: i64, limit: Limit) {
    assert_eq!(Limit::from(raw), limit);
}

#[test]
fn limit_allows() {
    assert!(Limit::Unlimited.allows(u32::MAX));
    assert!(Limit::Max(2).allows(1));
    assert!(!Limit::Max(2).allows(2));
    assert!(!Limit::Max(0).allows(0));
}

#[test]
fn empty_config_uses_defaults() {
    let config = GmConfig::parse("").unwrap();
    assert_eq!(config, GmConfig::default());
    assert_eq!(config.max_jobs_staging, Limit::Max(10));
    assert!(config.max_jobs.is_unlimited());
}

#[test]
fn full_config_parses() {
    let config = GmConfig::parse(
        r#"
control_dir = "/tmp/ctl"
max_jobs = 100
max_jobs_running = -1
max_jobs_staging = 20
max_jobs_per_dn = 3
max_retries = 5

[privileged_shares]
ops = 4

[finished_scan]
max_jobs = 10

[helpers]
libexec_dir = "/opt/arc/libexec"
default_lrms = "slurm"
long_running = ["/opt/arc/libexec/scan-slurm-job"]

[[plugins]]
states = ["FINISHED"]
command = "/bin/true %I"
onfailure = "log"
"#,
    )
    .unwrap();
    assert_eq!(config.control_dir, PathBuf::from("/tmp/ctl"));
    assert_eq!(config.max_jobs, Limit::Max(100));
    assert_eq!(config.max_jobs_running, Limit::Unlimited);
    assert_eq!(config.max_jobs_per_dn, Limit::Max(3));
    assert_eq!(config.reserved_slots("ops"), Some(4));
    assert_eq!(config.reserved_slots("atlas"), None);
    assert_eq!(config.finished_scan.max_jobs, 10);
    assert_eq!(config.finished_scan.period, 600);
    assert_eq!(config.plugins[0].onfailure, PluginAction::Log);
    assert_eq!(config.plugins[0].ontimeout, PluginAction::Fail);
    assert_eq!(config.plugins[0].timeout_secs, 10);
    assert!(config.plugins[0].fires_on(JobState::Finished));
    assert!(!config.plugins[0].fires_on(JobState::Accepted));
    assert_eq!(
        config.helpers.lrms_script("submit", ""),
        PathBuf::from("/opt/arc/libexec/submit-slurm-job")
    );
}

#[test]
fn plugin_with_unknown_state_rejected() {
    let err = GmConfig::parse(
        r#"
[[plugins]]
states = ["RUNNING"]
command = "/bin/true"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::UnknownState(s) if s == "RUNNING"));
}

#[test]
fn zero_finished_scan_batch_rejected() {
    let err = GmConfig::parse("[finished_scan]\nmax_jobs = 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::TooSmall("finished_scan.max_jobs")));
}

#[test]
fn load_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = GmConfig::load(&dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn session_root_defaults_next_to_control_dir() {
    let config = GmConfig::new("/var/spool/arc/jobstatus");
    assert_eq!(config.session_root(), PathBuf::from("/var/spool/arc/session"));
}

#[test]
fn setters_chain() {
    let config = GmConfig::new("/ctl").max_retries(3).max_jobs_per_dn(Limit::Max(1));
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.max_jobs_per_dn, Limit::Max(1));
}
