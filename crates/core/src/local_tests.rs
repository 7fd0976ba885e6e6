// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    plain = { "a b c", &["a", "b", "c"] },
    escaped_space = { "my\\ file gsiftp://host/x", &["my file", "gsiftp://host/x"] },
    escaped_backslash = { "a\\\\b", &["a\\b"] },
    empty_token = { "\\0 x", &["", "x"] },
    repeated_spaces = { "  a   b ", &["a", "b"] },
)]
fn split_escaped_tokens(input: &str, expected: &[&str]) {
    assert_eq!(split_escaped(input), expected);
}

#[test]
fn escape_is_inverse_of_split() {
    for s in ["plain", "with space", "back\\slash", "new\nline", ""] {
        assert_eq!(split_escaped(&escape(s)), vec![s.to_string()]);
    }
}

#[test]
fn file_data_parse_variants() {
    assert_eq!(FileData::parse("/in.txt"), Some(FileData::new("/in.txt", "")));
    assert_eq!(
        FileData::parse("/in.txt https://host/in.txt cred1"),
        Some(FileData::new("/in.txt", "https://host/in.txt").with_cred("cred1"))
    );
    assert_eq!(FileData::parse(""), None);
}

#[test]
fn file_data_has_lfn_requires_url() {
    assert!(FileData::new("/a", "srm://se/a").has_lfn());
    assert!(!FileData::new("/a", "").has_lfn());
    assert!(!FileData::new("/a", "relative").has_lfn());
}

#[test]
fn file_data_display_keeps_cred_position() {
    let data = FileData::new("/out", "").with_cred("c");
    assert_eq!(FileData::parse(&data.to_string()), Some(data));
}

#[test]
fn local_description_parses_known_keys() {
    let content = "\
globalid=https://ce/arex/1
lrms=slurm
queue=short
args=/bin/echo hello\\ world
subject=/DC=org/CN=Alice
lifetime=3600
processtime=1700000100
rerun=2
downloads=1
freestagein=yes
transfershare=atlas
inputfile=/in gsiftp://se/in
outputfile=/out
futurekey=ignored
";
    let desc = LocalDescription::parse(content).unwrap();
    assert_eq!(desc.lrms, "slurm");
    assert_eq!(desc.args, vec!["/bin/echo", "hello world"]);
    assert_eq!(desc.subject, "/DC=org/CN=Alice");
    assert_eq!(desc.lifetime, Some(3600));
    assert_eq!(desc.processtime, Some(1_700_000_100));
    assert_eq!(desc.reruns, 2);
    assert!(desc.freestagein);
    assert_eq!(desc.inputs, vec![FileData::new("/in", "gsiftp://se/in")]);
    assert_eq!(desc.outputs, vec![FileData::new("/out", "")]);
    assert_eq!(desc.priority, DEFAULT_PRIORITY);
    assert!(desc.has_executable());
}

#[test]
fn local_description_render_parses_back() {
    let desc = LocalDescription {
        lrms: "fork".to_string(),
        args: vec!["/bin/sh".to_string(), "-c".to_string(), "echo a b".to_string()],
        subject: "/CN=Bob".to_string(),
        cleanuptime: Some(1_700_500_000),
        sessiondir: Some(PathBuf::from("/sessions/abc")),
        failedstate: "PREPARING".to_string(),
        dryrun: true,
        outputs: vec![FileData::new("/result", "srm://se/result")],
        ..Default::default()
    };
    assert_eq!(LocalDescription::parse(&desc.render()).unwrap(), desc);
}

#[test]
fn local_description_reports_bad_lines() {
    assert_eq!(
        LocalDescription::parse("lrms=fork\nno equals sign\n"),
        Err(ParseError::Malformed { line: 2 })
    );
    assert!(matches!(
        LocalDescription::parse("rerun=many"),
        Err(ParseError::InvalidValue { key, .. }) if key == "rerun"
    ));
}

#[test]
fn staging_only_job_has_no_executable() {
    let desc = LocalDescription::parse("lrms=fork\n").unwrap();
    assert!(!desc.has_executable());
}
