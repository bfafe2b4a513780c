//! Thin wrappers around the system `git` command.
//!
//! Using the system binary means SSH keys, credential helpers and any other
//! authentication configured in `~/.gitconfig` work without extra setup.
//! Every function here is blocking; the reconciler runs them one at a time.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use log::debug;
use regex::Regex;

use crate::defaults::{GITMODULES_FILENAME, GIT_DIR_NAME};
use crate::error::{Error, Result};

/// Returns true if `git` is available in PATH.
pub fn is_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Whether `repo` is the top of its own git checkout.
///
/// An uninitialized submodule is an empty directory inside the superproject;
/// git commands run there would resolve the superproject instead.
pub fn is_checkout(repo: &Path) -> bool {
    repo.join(GIT_DIR_NAME).exists()
}

fn require_checkout(repo: &Path, command: &str) -> Result<()> {
    if is_checkout(repo) {
        return Ok(());
    }
    Err(Error::GitCommand {
        command: command.to_string(),
        path: repo.display().to_string(),
        stderr: "not a checked-out repository".to_string(),
    })
}

fn git_output(cwd: &Path, args: &[&str]) -> Result<Output> {
    debug!("git {} (in {})", args.join(" "), cwd.display());
    Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .map_err(|e| Error::GitCommand {
            command: args.join(" "),
            path: cwd.display().to_string(),
            stderr: e.to_string(),
        })
}

/// Run git and return trimmed stdout, failing on a non-zero exit.
fn run_git(cwd: &Path, args: &[&str]) -> Result<String> {
    let output = git_output(cwd, args)?;
    if !output.status.success() {
        return Err(Error::GitCommand {
            command: args.join(" "),
            path: cwd.display().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Register and clone a new submodule at `path` (relative to `root`).
pub fn submodule_add(root: &Path, url: &str, path: &str) -> Result<()> {
    let output = git_output(root, &["submodule", "add", url, path])?;
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);

    // Provide helpful error message for common auth failures
    let stderr = if stderr.contains("Authentication failed")
        || stderr.contains("Permission denied")
        || stderr.contains("Could not read from remote repository")
    {
        format!(
            "Authentication failed. Make sure you have access to {}.\n\
            For private repos, ensure you have:\n\
            - SSH key added to ssh-agent\n\
            - Git credentials configured\n\
            - Personal access token set up\n\
            Error: {}",
            url,
            stderr.trim()
        )
    } else {
        stderr.trim().to_string()
    };

    Err(Error::GitCommand {
        command: format!("submodule add {} {}", url, path),
        path: root.display().to_string(),
        stderr,
    })
}

/// Deregister a submodule and delete its checkout and cached git directory.
pub fn submodule_remove(root: &Path, path: &str) -> Result<()> {
    // deinit fails for submodules that were never initialized; that is fine
    if let Err(e) = run_git(root, &["submodule", "deinit", "-f", "--", path]) {
        debug!("ignoring deinit failure for {}: {}", path, e);
    }

    let modules_dir = root.join(GIT_DIR_NAME).join("modules").join(path);
    if modules_dir.exists() {
        fs::remove_dir_all(&modules_dir)?;
    }

    run_git(root, &["rm", "-f", "--", path])?;

    let checkout = root.join(path);
    if checkout.exists() {
        fs::remove_dir_all(&checkout)?;
    }
    Ok(())
}

/// Merge the latest upstream commit into a submodule checkout.
///
/// `--init` makes this also work for registered mirrors that were never
/// checked out; `--merge` keeps local-only commits.
pub fn submodule_update(root: &Path, path: &str) -> Result<()> {
    run_git(
        root,
        &["submodule", "update", "--init", "--remote", "--merge", "--", path],
    )?;
    Ok(())
}

/// Check out the commit the superproject records for a registered submodule.
pub fn submodule_init(root: &Path, path: &str) -> Result<()> {
    run_git(root, &["submodule", "update", "--init", "--", path])?;
    Ok(())
}

/// Fetch remote metadata for the repository at `repo`. No working-tree change.
pub fn fetch(repo: &Path) -> Result<()> {
    require_checkout(repo, "fetch")?;
    run_git(repo, &["fetch", "--quiet"])?;
    Ok(())
}

/// Number of upstream commits not yet in `HEAD`.
///
/// `Ok(None)` when there is no upstream tracking branch to compare against.
pub fn commits_behind(repo: &Path) -> Result<Option<u32>> {
    require_checkout(repo, "rev-list --count HEAD..@{u}")?;
    let output = git_output(repo, &["rev-list", "--count", "HEAD..@{u}"])?;
    if !output.status.success() {
        debug!(
            "no upstream for {}: {}",
            repo.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return Ok(None);
    }
    Ok(parse_count(&String::from_utf8_lossy(&output.stdout)))
}

/// The commit SHA checked out at `repo`, if it has one.
///
/// `Ok(None)` when `repo` is not a checkout of its own.
pub fn head_sha(repo: &Path) -> Result<Option<String>> {
    if !is_checkout(repo) {
        return Ok(None);
    }
    let output = git_output(repo, &["rev-parse", "HEAD"])?;
    if !output.status.success() {
        return Ok(None);
    }
    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok((!sha.is_empty()).then_some(sha))
}

/// Submodule paths listed in `<root>/.gitmodules`. Missing file means none.
pub fn registered_submodules(root: &Path) -> Result<Vec<String>> {
    let gitmodules = root.join(GITMODULES_FILENAME);
    if !gitmodules.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(&gitmodules)?;
    parse_gitmodules_paths(&content)
}

/// Extract every `path = ...` value from `.gitmodules` content.
pub fn parse_gitmodules_paths(content: &str) -> Result<Vec<String>> {
    let re = Regex::new(r"(?m)^\s*path\s*=\s*(.+?)\s*$")?;
    let mut paths: Vec<String> = re
        .captures_iter(content)
        .map(|caps| normalize_mirror_path(&caps[1]))
        .filter(|path| !path.is_empty())
        .collect();
    paths.sort();
    paths.dedup();
    Ok(paths)
}

/// Canonical form for comparing mirror paths: forward slashes, no `./`
/// prefix, no trailing slash.
pub fn normalize_mirror_path(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    let path = path.strip_prefix("./").unwrap_or(&path);
    path.trim_end_matches('/').to_string()
}

fn parse_count(stdout: &str) -> Option<u32> {
    stdout.trim().parse().ok()
}
