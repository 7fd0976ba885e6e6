//! Shared helpers for specs.

use std::path::{Path, PathBuf};
use std::process::Output;

pub use tempfile::TempDir;

/// A scratch grid-manager installation: control dir plus session root.
pub struct ControlDir {
    dir: TempDir,
}

impl ControlDir {
    /// Control dir with the bucket layout in place.
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        for bucket in ["accepting", "processing", "finished", "restarting", "logs"] {
            std::fs::create_dir_all(dir.path().join("control").join(bucket)).unwrap();
        }
        std::fs::create_dir_all(dir.path().join("session")).unwrap();
        Self { dir }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join("control")
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Place a job with the given status line in the bucket its state maps to.
    pub fn job(&self, id: &str, status: &str, local: &str) -> &Self {
        let state = status.trim_start_matches("PENDING:");
        let bucket = match state {
            "ACCEPTED" => "accepting",
            "FINISHED" | "DELETED" => "finished",
            _ => "processing",
        };
        std::fs::write(self.path().join(bucket).join(format!("job.{id}.status")), status).unwrap();
        std::fs::write(self.path().join(format!("job.{id}.local")), local).unwrap();
        self
    }

    pub fn has_mark(&self, id: &str, mark: &str) -> bool {
        self.path().join("accepting").join(format!("job.{id}.{mark}")).is_file()
    }

    /// Minimal configuration file pointing at this control dir.
    pub fn config_file(&self) -> PathBuf {
        let path = self.root().join("arex-gm.toml");
        let content = format!(
            "control_dir = {:?}\nsession_root = {:?}\nwakeup_period = 1\n",
            self.path(),
            self.root().join("session"),
        );
        std::fs::write(&path, content).unwrap();
        path
    }
}

/// `gm-jobs` invocation builder.
pub fn cli() -> CliBuilder {
    CliBuilder { args: Vec::new() }
}

pub struct CliBuilder {
    args: Vec<String>,
}

impl CliBuilder {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn control_dir(self, dir: &ControlDir) -> Self {
        let path = dir.path();
        self.args(&["--control-dir", path.to_str().unwrap()])
    }

    fn run(self) -> Output {
        assert_cmd::Command::cargo_bin("gm-jobs")
            .unwrap()
            .args(&self.args)
            .env_remove("AREX_CONTROL_DIR")
            .env_remove("AREX_CONFIG")
            .env("NO_COLOR", "1")
            .output()
            .unwrap()
    }

    /// Run and require exit status 0.
    pub fn passes(self) -> RunAssert {
        let out = RunAssert::from(self.run());
        assert_eq!(out.code, Some(0), "expected success\n{}", out.dump());
        out
    }

    /// Run and require a non-zero exit status.
    pub fn fails(self) -> RunAssert {
        let out = RunAssert::from(self.run());
        assert_ne!(out.code, Some(0), "expected failure\n{}", out.dump());
        out
    }
}

pub struct RunAssert {
    pub stdout: String,
    pub stderr: String,
    pub code: Option<i32>,
}

impl From<Output> for RunAssert {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code(),
        }
    }
}

impl RunAssert {
    fn dump(&self) -> String {
        format!("--- stdout ---\n{}\n--- stderr ---\n{}", self.stdout, self.stderr)
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(self.stdout.contains(needle), "stdout lacks {needle:?}\n{}", self.dump());
        self
    }

    pub fn stdout_lacks(self, needle: &str) -> Self {
        assert!(!self.stdout.contains(needle), "stdout has {needle:?}\n{}", self.dump());
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr.contains(needle), "stderr lacks {needle:?}\n{}", self.dump());
        self
    }

    pub fn code_is(self, code: i32) -> Self {
        assert_eq!(self.code, Some(code), "{}", self.dump());
        self
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout).unwrap()
    }
}
