//! # Mirror Version-Control Operations
//!
//! The reconciler never shells out to git directly. It talks to the
//! [`GitOperations`] trait, which describes everything the engine needs from
//! version control:
//!
//! - enumerate the mirrors registered in git metadata,
//! - register/clone and deregister mirrors,
//! - check out a registered mirror that has no working copy,
//! - merge upstream changes into a mirror,
//! - fetch remote metadata and compare a mirror against its upstream.
//!
//! [`DefaultGitOperations`] wraps the system `git` command via [`crate::git`].
//! Tests substitute a mock that records calls and simulates checkouts in a
//! [`crate::filesystem::MemoryFS`].
//!
//! All paths are relative to the working-tree root.

use crate::error::Result;
use std::path::PathBuf;

/// Trait for git operations - allows mocking in tests
pub trait GitOperations {
    /// Mirror paths currently registered in git metadata, sorted.
    fn registered_mirrors(&self) -> Result<Vec<String>>;

    /// Register `url` as a mirror at `path` and check it out.
    fn add_mirror(&self, url: &str, path: &str) -> Result<()>;

    /// Deregister the mirror at `path` and delete its checkout.
    fn remove_mirror(&self, path: &str) -> Result<()>;

    /// Check out the recorded commit of a registered mirror with no working copy.
    fn checkout_mirror(&self, path: &str) -> Result<()>;

    /// Merge the latest upstream content into the mirror at `path`.
    fn update_mirror(&self, path: &str) -> Result<()>;

    /// Refresh remote-tracking metadata for the mirror at `path`.
    fn fetch(&self, path: &str) -> Result<()>;

    /// Upstream commits missing from the mirror; `None` without an upstream.
    fn commits_behind(&self, path: &str) -> Result<Option<u32>>;

    /// Commit currently checked out in the mirror, if any.
    fn head_revision(&self, path: &str) -> Result<Option<String>>;
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command inside the working tree at `root`.
#[derive(Debug, Clone)]
pub struct DefaultGitOperations {
    root: PathBuf,
}

impl DefaultGitOperations {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn mirror_dir(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl GitOperations for DefaultGitOperations {
    fn registered_mirrors(&self) -> Result<Vec<String>> {
        crate::git::registered_submodules(&self.root)
    }

    fn add_mirror(&self, url: &str, path: &str) -> Result<()> {
        crate::git::submodule_add(&self.root, url, path)
    }

    fn remove_mirror(&self, path: &str) -> Result<()> {
        crate::git::submodule_remove(&self.root, path)
    }

    fn checkout_mirror(&self, path: &str) -> Result<()> {
        crate::git::submodule_init(&self.root, path)
    }

    fn update_mirror(&self, path: &str) -> Result<()> {
        crate::git::submodule_update(&self.root, path)
    }

    fn fetch(&self, path: &str) -> Result<()> {
        crate::git::fetch(&self.mirror_dir(path))
    }

    fn commits_behind(&self, path: &str) -> Result<Option<u32>> {
        crate::git::commits_behind(&self.mirror_dir(path))
    }

    fn head_revision(&self, path: &str) -> Result<Option<String>> {
        crate::git::head_sha(&self.mirror_dir(path))
    }
}
