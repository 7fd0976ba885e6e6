// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Helper process spawning.
//!
//! Helpers run in their own process group so a kill reaches anything they
//! forked. Output goes to a per-job log file when one is given, otherwise it
//! is discarded.

use crate::error::AdapterError;
use arex_core::{HelperProcess, EXIT_LOST};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// How often a synchronous run checks whether the helper exited.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Command line for an external helper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperCommand {
    program: PathBuf,
    args: Vec<OsString>,
    log: Option<PathBuf>,
    envs: Vec<(String, String)>,
}

impl HelperCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new(), log: None, envs: Vec::new() }
    }

    /// `sh -c <line>`.
    pub fn shell(line: &str) -> Self {
        Self::new("/bin/sh").arg("-c").arg(line)
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Append stdout and stderr to `path`.
    pub fn log_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.log = Some(path.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn arg_list(&self) -> &[OsString] {
        &self.args
    }

    /// Program name for log messages.
    pub fn name(&self) -> String {
        self.program.display().to_string()
    }

    fn command(&self, capture: bool) -> Result<Command, AdapterError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).stdin(Stdio::null()).process_group(0);
        for (k, v) in &self.envs {
            cmd.env(k, v);
        }
        if capture {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else if let Some(path) = &self.log {
            let out = open_log(path)?;
            let err = out.try_clone().map_err(|source| AdapterError::Io { path: path.clone(), source })?;
            cmd.stdout(out).stderr(err);
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
        Ok(cmd)
    }

    /// Start the helper without waiting for it.
    pub fn spawn(&self) -> Result<OsProcess, AdapterError> {
        let child = self
            .command(false)?
            .spawn()
            .map_err(|source| AdapterError::Spawn { program: self.name(), source })?;
        tracing::debug!(program = %self.program.display(), pid = child.id(), "helper started");
        Ok(OsProcess { pid: child.id(), child: Some(child), exit: None })
    }

    /// Run to completion, killing the helper if it outlives `timeout`.
    pub fn run_with_timeout(&self, timeout: Duration) -> Result<HelperOutput, AdapterError> {
        let mut child = self
            .command(true)?
            .spawn()
            .map_err(|source| AdapterError::Spawn { program: self.name(), source })?;
        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) if started.elapsed() >= timeout => {
                    kill_group(&mut child);
                    reap(child);
                    return Err(AdapterError::Timeout { program: self.name(), secs: timeout.as_secs() });
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(source) => return Err(AdapterError::Spawn { program: self.name(), source }),
            }
        }
        let output = child
            .wait_with_output()
            .map_err(|source| AdapterError::Spawn { program: self.name(), source })?;
        Ok(HelperOutput {
            code: output.status.code().unwrap_or(EXIT_LOST),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Result of a helper run to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl HelperOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Whatever the helper said, preferring stdout.
    pub fn response(&self) -> &str {
        if self.stdout.is_empty() {
            &self.stderr
        } else {
            &self.stdout
        }
    }
}

/// A spawned OS process polled by the engine.
///
/// `child` is `None` once the process has been reaped or handed to a
/// reaper thread, at which point `exit` holds the code reported for it.
#[derive(Debug)]
pub struct OsProcess {
    pid: u32,
    child: Option<Child>,
    exit: Option<i32>,
}

impl OsProcess {
    pub fn into_boxed(self) -> Box<dyn HelperProcess> {
        Box::new(self)
    }
}

impl HelperProcess for OsProcess {
    fn try_exit_code(&mut self) -> Option<i32> {
        if let Some(code) = self.exit {
            return Some(code);
        }
        let child = self.child.as_mut()?;
        let code = match child.try_wait() {
            Ok(Some(status)) => status.code().unwrap_or(EXIT_LOST),
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(pid = self.pid, error = %e, "lost track of helper process");
                EXIT_LOST
            }
        };
        self.child = None;
        self.exit = Some(code);
        Some(code)
    }

    /// SIGKILL the process group without waiting for it to die.
    ///
    /// A process stuck in uninterruptible I/O ignores the signal until the
    /// I/O completes, so anything still alive is reaped in the background.
    fn kill(&mut self) {
        if let Some(mut child) = self.child.take() {
            kill_group(&mut child);
            reap(child);
            self.exit = Some(EXIT_LOST);
        }
    }

    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }
}

impl Drop for OsProcess {
    fn drop(&mut self) {
        if let Some(child) = self.child.take() {
            reap(child);
        }
    }
}

fn kill_group(child: &mut Child) {
    let sent = i32::try_from(child.id())
        .ok()
        .map(|pid| killpg(Pid::from_raw(pid), Signal::SIGKILL).is_ok())
        .unwrap_or(false);
    if !sent {
        let _ = child.kill();
    }
}

/// Collect the exit status of `child` without blocking the caller.
///
/// Exited children are reaped in place. Live ones get a detached thread
/// that waits for them so no zombie is left behind.
fn reap(mut child: Child) {
    if let Ok(Some(_)) = child.try_wait() {
        return;
    }
    let pid = child.id();
    let spawned = std::thread::Builder::new()
        .name(format!("reap-{pid}"))
        .spawn(move || {
            let _ = child.wait();
        });
    if let Err(e) = spawned {
        tracing::warn!(pid, error = %e, "failed to start reaper, helper may linger as a zombie");
    }
}

fn open_log(path: &Path) -> Result<File, AdapterError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| AdapterError::Io { path: path.to_path_buf(), source })
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
