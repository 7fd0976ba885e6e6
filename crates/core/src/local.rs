// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsed job requirements (`job.<id>.local`) and transfer list entries.
//!
//! The on-disk format is one `key=value` per line. Multi-valued keys
//! (`inputfile`, `outputfile`) repeat. Values that are lists use
//! backslash-escaped, space-separated tokens.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from parsing control-file content
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: expected key=value")]
    Malformed { line: usize },
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
    #[error("invalid file entry: {0:?}")]
    InvalidFile(String),
}

/// One file transfer: session-relative name, remote location, optional
/// delegated credential reference.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileData {
    pub pfn: String,
    pub lfn: String,
    pub cred: Option<String>,
}

impl FileData {
    pub fn new(pfn: impl Into<String>, lfn: impl Into<String>) -> Self {
        Self { pfn: pfn.into(), lfn: lfn.into(), cred: None }
    }

    pub fn with_cred(mut self, cred: impl Into<String>) -> Self {
        self.cred = Some(cred.into());
        self
    }

    /// True when the entry names a remote location (a URL).
    pub fn has_lfn(&self) -> bool {
        self.lfn.contains(':')
    }

    /// Parse a `pfn [lfn [cred]]` line.
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = split_escaped(line).into_iter();
        let pfn = tokens.next().filter(|p| !p.is_empty())?;
        let lfn = tokens.next().unwrap_or_default();
        let cred = tokens.next();
        Some(Self { pfn, lfn, cred })
    }
}

impl fmt::Display for FileData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&escape(&self.pfn))?;
        if !self.lfn.is_empty() || self.cred.is_some() {
            write!(f, " {}", escape(&self.lfn))?;
        }
        if let Some(cred) = &self.cred {
            write!(f, " {}", escape(cred))?;
        }
        Ok(())
    }
}

/// Escape backslash, space and line breaks so a token survives a line-based file.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ' ' => out.push_str("\\ "),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    // Empty tokens would vanish on split
    if out.is_empty() {
        out.push_str("\\0");
    }
    out
}

/// Split on unescaped spaces, undoing [`escape`].
pub fn split_escaped(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                in_token = true;
                match chars.next() {
                    Some('n') => current.push('\n'),
                    Some('r') => current.push('\r'),
                    Some('0') => {}
                    Some(other) => current.push(other),
                    None => current.push('\\'),
                }
            }
            ' ' | '\t' => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                in_token = true;
                current.push(c);
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

/// Job requirements and bookkeeping persisted alongside the status file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalDescription {
    pub globalid: String,
    pub lrms: String,
    pub queue: String,
    /// LRMS-native identifier, known once submission succeeded.
    pub localid: String,
    /// Executable followed by its arguments. Empty for staging-only jobs.
    pub args: Vec<String>,
    /// Owning identity (certificate subject).
    pub subject: String,
    pub starttime: Option<u64>,
    /// Requested retention after finishing, in seconds.
    pub lifetime: Option<u64>,
    pub notify: String,
    /// Do not start processing before this time.
    pub processtime: Option<u64>,
    pub exectime: Option<u64>,
    pub reruns: u32,
    pub downloads: u32,
    pub uploads: u32,
    pub jobname: String,
    pub cleanuptime: Option<u64>,
    pub sessiondir: Option<PathBuf>,
    /// State the job was in when it last failed, empty if it never failed.
    pub failedstate: String,
    pub failedcause: String,
    /// Client pushes input files itself and confirms via `input_status`.
    pub freestagein: bool,
    pub transfershare: String,
    pub priority: u32,
    pub dryrun: bool,
    /// LRMS exit code that counts as success.
    pub successcode: i32,
    pub inputs: Vec<FileData>,
    pub outputs: Vec<FileData>,
}

pub const DEFAULT_PRIORITY: u32 = 50;

impl Default for LocalDescription {
    fn default() -> Self {
        Self {
            globalid: String::new(),
            lrms: String::new(),
            queue: String::new(),
            localid: String::new(),
            args: Vec::new(),
            subject: String::new(),
            starttime: None,
            lifetime: None,
            notify: String::new(),
            processtime: None,
            exectime: None,
            reruns: 0,
            downloads: 0,
            uploads: 0,
            jobname: String::new(),
            cleanuptime: None,
            sessiondir: None,
            failedstate: String::new(),
            failedcause: String::new(),
            freestagein: false,
            transfershare: String::new(),
            priority: DEFAULT_PRIORITY,
            dryrun: false,
            successcode: 0,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }
}

impl LocalDescription {
    pub fn has_executable(&self) -> bool {
        !self.args.is_empty()
    }

    pub fn parse(content: &str) -> Result<Self, ParseError> {
        let mut desc = Self::default();
        for (n, line) in content.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or(ParseError::Malformed { line: n + 1 })?;
            desc.set(key.trim(), value)?;
        }
        Ok(desc)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ParseError> {
        match key {
            "globalid" => self.globalid = value.to_string(),
            "lrms" => self.lrms = value.to_string(),
            "queue" => self.queue = value.to_string(),
            "localid" => self.localid = value.to_string(),
            "args" => self.args = split_escaped(value),
            "subject" => self.subject = value.to_string(),
            "starttime" => self.starttime = Some(number(key, value)?),
            "lifetime" => self.lifetime = Some(number(key, value)?),
            "notify" => self.notify = value.to_string(),
            "processtime" => self.processtime = Some(number(key, value)?),
            "exectime" => self.exectime = Some(number(key, value)?),
            "rerun" => self.reruns = number(key, value)?,
            "downloads" => self.downloads = number(key, value)?,
            "uploads" => self.uploads = number(key, value)?,
            "jobname" => self.jobname = value.to_string(),
            "cleanuptime" => self.cleanuptime = Some(number(key, value)?),
            "sessiondir" => self.sessiondir = Some(PathBuf::from(value)),
            "failedstate" => self.failedstate = value.to_string(),
            "failedcause" => self.failedcause = value.to_string(),
            "freestagein" => self.freestagein = flag(value),
            "transfershare" => self.transfershare = value.to_string(),
            "priority" => self.priority = number(key, value)?,
            "dryrun" => self.dryrun = flag(value),
            "successcode" => self.successcode = number(key, value)?,
            "inputfile" => self.inputs.push(file(value)?),
            "outputfile" => self.outputs.push(file(value)?),
            // Keys from newer frontends
            _ => {}
        }
        Ok(())
    }

    /// Render in the on-disk format. Unset optional fields are omitted.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut kv = |key: &str, value: &dyn fmt::Display| {
            let _ = writeln!(out, "{key}={value}");
        };
        let text = [
            ("globalid", &self.globalid),
            ("lrms", &self.lrms),
            ("queue", &self.queue),
            ("localid", &self.localid),
            ("subject", &self.subject),
            ("notify", &self.notify),
            ("jobname", &self.jobname),
            ("failedstate", &self.failedstate),
            ("failedcause", &self.failedcause),
            ("transfershare", &self.transfershare),
        ];
        for (key, value) in text {
            if !value.is_empty() {
                kv(key, value);
            }
        }
        if !self.args.is_empty() {
            let args: Vec<String> = self.args.iter().map(|a| escape(a)).collect();
            kv("args", &args.join(" "));
        }
        let times = [
            ("starttime", self.starttime),
            ("lifetime", self.lifetime),
            ("processtime", self.processtime),
            ("exectime", self.exectime),
            ("cleanuptime", self.cleanuptime),
        ];
        for (key, value) in times {
            if let Some(value) = value {
                kv(key, &value);
            }
        }
        if let Some(dir) = &self.sessiondir {
            kv("sessiondir", &dir.display());
        }
        kv("rerun", &self.reruns);
        kv("downloads", &self.downloads);
        kv("uploads", &self.uploads);
        kv("priority", &self.priority);
        kv("successcode", &self.successcode);
        kv("freestagein", &yes_no(self.freestagein));
        kv("dryrun", &yes_no(self.dryrun));
        for input in &self.inputs {
            kv("inputfile", input);
        }
        for output in &self.outputs {
            kv("outputfile", output);
        }
        out
    }
}

fn number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ParseError> {
    value
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidValue { key: key.to_string(), value: value.to_string() })
}

fn flag(value: &str) -> bool {
    matches!(value.trim(), "yes" | "true" | "1")
}

fn yes_no(v: bool) -> &'static str {
    if v {
        "yes"
    } else {
        "no"
    }
}

fn file(value: &str) -> Result<FileData, ParseError> {
    FileData::parse(value).ok_or_else(|| ParseError::InvalidFile(value.to_string()))
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
