#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use taskmaster::storage::DATA_DIR_ENV;
use tempfile::TempDir;

/// A throwaway taskmaster data directory
pub struct TestData {
    dir: TempDir,
}

impl TestData {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        fs::create_dir_all(self.data_dir())?;
        let path = self.data_dir().join("taskmaster.toml");
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn write_file(&self, name: &str, contents: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// `taskmaster` bound to this data directory, with logging off
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("taskmaster").expect("binary");
        cmd.env(DATA_DIR_ENV, self.data_dir());
        cmd.env_remove("RUST_LOG");
        cmd
    }

    /// Run with `--json`, assert success and return the `data` payload.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let value: Value = serde_json::from_slice(&output).expect("json output");
        assert_eq!(value["status"], "success");
        value["data"].clone()
    }

    /// Run with `--json`, assert failure with `code` and return the `error` body.
    pub fn json_error(&self, args: &[&str], code: i32) -> Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .code(code)
            .get_output()
            .stdout
            .clone();
        let value: Value = serde_json::from_slice(&output).expect("json error output");
        assert_eq!(value["status"], "error");
        value["error"].clone()
    }

    pub fn new_task(&self, args: &[&str]) -> String {
        let mut full = vec!["task", "new"];
        full.extend_from_slice(args);
        let data = self.json(&full);
        data["id"].as_str().expect("task id").to_string()
    }
}
