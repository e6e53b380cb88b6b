//! Shared E2E test helpers for `herald` binary tests.

use assert_cmd::cargo::cargo_bin_cmd;
use std::path::Path;
use std::time::Duration;

/// Default timeout for CLI tests.
pub const TIMEOUT_BASIC: Duration = Duration::from_secs(10);

/// Environment variables that would leak the caller's settings into a test.
const HERALD_VARS: &[&str] = &[
    "HERALD_CONFIG",
    "HERALD_DEBUG",
    "HERALD_STORAGE",
    "HERALD_MAX_LOG_SIZE",
    "RUST_LOG",
];

/// A project directory with its own home, so no global config is read.
pub struct Sandbox {
    pub root: tempfile::TempDir,
}

impl Sandbox {
    /// Creates an empty project.
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().expect("create temp project dir"),
        }
    }

    /// Creates a project with `.herald/config.toml` holding `config`.
    pub fn with_config(config: &str) -> Self {
        let sandbox = Self::new();
        let dir = sandbox.root.path().join(".herald");
        std::fs::create_dir_all(&dir).expect("create .herald");
        std::fs::write(dir.join("config.toml"), config).expect("write config");
        sandbox
    }

    /// Project root.
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Default diagnostics directory.
    pub fn storage(&self) -> std::path::PathBuf {
        self.path().join("data")
    }

    /// Builds a `herald` command rooted at this project.
    pub fn cmd(&self) -> assert_cmd::Command {
        let mut cmd: assert_cmd::Command = cargo_bin_cmd!("herald");
        cmd.timeout(TIMEOUT_BASIC);
        for var in HERALD_VARS {
            cmd.env_remove(var);
        }
        cmd.env("HOME", self.path().join("home"));
        cmd.current_dir(self.path());
        cmd
    }
}
