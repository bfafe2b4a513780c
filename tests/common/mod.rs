//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_registry(registries::EMPTY);
//!     fixture.command().arg("check").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::git_available;
    #[allow(unused_imports)]
    pub use super::registries;
    pub use super::TestFixture;
}

/// Registry snippets used across tests.
#[allow(dead_code)]
pub mod registries {
    /// Nothing declared.
    pub const EMPTY: &str = "# skill-sync registry\n";

    /// Only manual outputs; needs no git at all.
    pub const MANUAL_ONLY: &str = r#"
manual:
  - commit-message
  - release-notes
"#;

    /// Not valid YAML.
    pub const INVALID_YAML: &str = "sources: [unclosed";
}

/// Whether a usable `git` binary is on PATH.
#[allow(dead_code)]
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// A temporary working tree with an optional registry.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write `.skill-sync.yaml` with the given content.
    pub fn with_registry(self, content: &str) -> Self {
        self.temp_dir
            .child(".skill-sync.yaml")
            .write_str(content)
            .expect("Failed to write registry");
        self
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Turn the fixture into a git repository.
    #[allow(dead_code)]
    pub fn with_git_repo(self) -> Self {
        run_git(self.path(), &["init", "--quiet"]);
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// A `skill-sync` command running in this fixture, colors off, and
    /// local-path submodules allowed.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("skill-sync");
        cmd.current_dir(self.path())
            .env_remove("SKILL_SYNC_ROOT")
            .env_remove("SKILL_SYNC_CONFIG")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1")
            .env("GIT_CONFIG_COUNT", "1")
            .env("GIT_CONFIG_KEY_0", "protocol.file.allow")
            .env("GIT_CONFIG_VALUE_0", "always");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Run git in `dir` with a fixed identity, panicking on failure.
#[allow(dead_code)]
pub fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
        .args(["-c", "protocol.file.allow=always"])
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to spawn git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Create a committed upstream repository at `dir` holding `files`.
#[allow(dead_code)]
pub fn create_upstream(dir: &Path, files: &[(&str, &str)]) -> PathBuf {
    std::fs::create_dir_all(dir).expect("Failed to create upstream dir");
    run_git(dir, &["init", "--quiet"]);
    commit_files(dir, files, "initial");
    dir.to_path_buf()
}

/// Write `files` into the repository at `dir` and commit them.
#[allow(dead_code)]
pub fn commit_files(dir: &Path, files: &[(&str, &str)], message: &str) {
    for (path, content) in files {
        let full = dir.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent");
        }
        std::fs::write(&full, content).expect("Failed to write upstream file");
    }
    run_git(dir, &["add", "-A"]);
    run_git(dir, &["commit", "--quiet", "-m", message]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_with_registry() {
        let fixture = TestFixture::new().with_registry(registries::EMPTY);
        assert!(fixture.path().join(".skill-sync.yaml").exists());
    }

    #[test]
    fn test_fixture_with_file() {
        let fixture = TestFixture::new().with_file("skills/a/SKILL.md", "a");
        assert!(fixture.path().join("skills/a/SKILL.md").exists());
    }
}
