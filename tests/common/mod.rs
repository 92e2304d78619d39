//! Isolated environment for driving the templater binary
//!
//! Each `TestEnv` gets its own project directory (the working directory of
//! every command) and its own home, so no real user config leaks in.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// Result of running a templater command
#[derive(Debug)]
pub struct TestResult {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl TestResult {
    pub fn combined_output(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }

    /// stdout parsed as one JSON value
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(self.stdout.trim()).unwrap_or_else(|e| {
            panic!("stdout is not JSON ({e}):\n{}", self.combined_output())
        })
    }
}

pub struct TestEnv {
    pub project_root: TempDir,
    pub home_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            project_root: tempfile::tempdir().unwrap(),
            home_dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.project_root.path().join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }

    pub fn run(&self, args: &[&str]) -> TestResult {
        self.run_in(self.project_root.path(), args)
    }

    pub fn run_in(&self, cwd: &Path, args: &[&str]) -> TestResult {
        let output = Command::new(env!("CARGO_BIN_EXE_templater"))
            .args(args)
            .current_dir(cwd)
            .env("HOME", self.home_dir.path())
            .env("XDG_CONFIG_HOME", self.home_dir.path().join(".config"))
            .env_remove("RUST_LOG")
            .env_remove("TEMPLATER_OUTPUT_DIR")
            .env_remove("TEMPLATER_BACKUP")
            .env_remove("TEMPLATER_WORKERS")
            .output()
            .unwrap();

        TestResult {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}
