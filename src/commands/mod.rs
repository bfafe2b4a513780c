//! # CLI Command Implementations
//!
//! Each subcommand of `skill-sync` lives in its own file. A command module
//! contains an optional `Args` struct (derived with `clap`) and an `execute`
//! function that loads the registry, drives the
//! [`skill_sync::reconciler::Reconciler`] and prints its report.
//!
//! Everything commands share (root, registry path, prompt policy, output
//! settings) is carried by [`Context`].

pub mod check;
pub mod cleanup;
pub mod init;
pub mod sync;

use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use log::warn;

use skill_sync::config::{self, Registry};
use skill_sync::filesystem::DiskFS;
use skill_sync::git;
use skill_sync::output::{emoji, OutputConfig};
use skill_sync::prompt::{AutoConfirm, Prompt, TerminalPrompt};
use skill_sync::reconciler::ItemFailure;
use skill_sync::repository::DefaultGitOperations;

/// Settings resolved from global flags.
#[derive(Debug, Clone)]
pub struct Context {
    pub root: PathBuf,
    pub config_path: PathBuf,
    /// Accept all confirmations.
    pub yes: bool,
    pub out: OutputConfig,
}

impl Context {
    /// Registry path, resolved against the root when relative.
    pub fn registry_path(&self) -> PathBuf {
        if self.config_path.is_absolute() {
            self.config_path.clone()
        } else {
            self.root.join(&self.config_path)
        }
    }

    pub fn load_registry(&self) -> Result<Registry> {
        if !self.root.is_dir() {
            bail!("Root directory not found: {}", self.root.display());
        }

        let path = self.registry_path();
        if !path.exists() {
            bail!(
                "Registry not found: {}\n  Create it with `sources:`, `vendors:` and `manual:` sections",
                path.display()
            );
        }

        let registry = config::from_file(&path)
            .map_err(|e| anyhow!("Failed to load registry from {}: {}", path.display(), e))?;
        if registry.is_empty() {
            warn!(
                "{} declares nothing; every mirror and output counts as extra",
                path.display()
            );
        }
        Ok(registry)
    }

    /// Fail early when mirrors are declared but `git` is missing.
    pub fn require_git(&self, registry: &Registry) -> Result<()> {
        if !registry.mirrors().is_empty() && !git::is_available() {
            bail!("git is required but was not found in PATH");
        }
        Ok(())
    }

    pub fn filesystem(&self) -> DiskFS {
        DiskFS::new(&self.root)
    }

    pub fn git(&self) -> DefaultGitOperations {
        DefaultGitOperations::new(&self.root)
    }

    pub fn prompt(&self) -> Box<dyn Prompt> {
        if self.yes {
            Box::new(AutoConfirm)
        } else {
            Box::new(TerminalPrompt::new())
        }
    }

    pub fn cancelled(&self) {
        println!("{} Cancelled", emoji(&self.out, "✋", "[CANCEL]"));
    }

    /// Print one line per item with a marker.
    pub fn list(&self, marker: (&str, &str), items: &[String]) {
        for item in items {
            println!("  {} {}", emoji(&self.out, marker.0, marker.1), item);
        }
    }

    /// Report per-item failures; any failure makes the command exit non-zero.
    pub fn finish(&self, failures: &[ItemFailure]) -> Result<()> {
        if failures.is_empty() {
            println!("{} Done", emoji(&self.out, "✅", "[OK]"));
            return Ok(());
        }

        println!(
            "\n{} {} item(s) failed:",
            emoji(&self.out, "❌", "[ERR]"),
            failures.len()
        );
        for failure in failures {
            println!("  {} {}", failure.item, self.out.dim(&failure.reason));
        }
        bail!("{} item(s) failed", failures.len())
    }
}
