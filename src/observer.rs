//! # State Observer
//!
//! Produces the *observed state* of the working tree: which mirrors git knows
//! about, which of the declared ones are checked out, how far each is behind
//! its upstream, which outputs exist under `skills/`, and whether every vendor
//! mapping entry currently has a source to copy from.
//!
//! Observation is recomputed at the start of every operation. It never writes
//! to the working tree; with [`ObserveDepth::Upstream`] it performs a
//! `git fetch` per mirror, which only touches remote-tracking metadata.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Serialize;

use crate::config::{MirrorKind, Registry};
use crate::defaults::{GIT_DIR_NAME, SKILLS_DIR, VENDOR_SKILLS_DIR};
use crate::diff;
use crate::error::Result;
use crate::filesystem::FileSystem;
use crate::git::normalize_mirror_path;
use crate::repository::GitOperations;

/// How much of the upstream relationship to inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserveDepth {
    /// Local metadata and files only. Behind counts stay [`BehindCount::Unknown`].
    Local,
    /// Fetch each mirror and compare against its upstream.
    Upstream,
}

/// Upstream commits a mirror is missing.
///
/// `Unknown` (no upstream, fetch failed, not inspected) is never conflated
/// with `Known(0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "count")]
pub enum BehindCount {
    Known(u32),
    Unknown,
}

impl fmt::Display for BehindCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BehindCount::Known(n) => write!(f, "{}", n),
            BehindCount::Unknown => f.write_str("unknown"),
        }
    }
}

/// Observed state of one declared mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedMirrorState {
    pub name: String,
    pub kind: MirrorKind,
    pub path: String,
    /// Listed in git metadata.
    pub registered: bool,
    /// Has a working copy of its own. An empty directory left by a
    /// non-recursive clone does not count.
    pub checked_out: bool,
    pub behind: BehindCount,
    pub head_revision: Option<String>,
}

/// Whether a vendor mapping entry can be regenerated right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStatus {
    Ready,
    MissingMirror,
    MissingSkillsDir,
    MissingSource,
}

/// One vendor mapping entry resolved against the working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorTarget {
    pub vendor: String,
    /// Sub-resource name from the mapping.
    pub source_name: String,
    pub output_name: String,
    /// `vendor/<vendor>`
    pub mirror_path: PathBuf,
    /// `vendor/<vendor>/skills/<source_name>`
    pub source_path: PathBuf,
    /// `skills/<output_name>`
    pub output_path: PathBuf,
    pub status: TargetStatus,
}

impl VendorTarget {
    /// Human-readable reason a target is not ready.
    pub fn problem(&self) -> Option<String> {
        match self.status {
            TargetStatus::Ready => None,
            TargetStatus::MissingMirror => Some(format!(
                "Vendor mirror not found: {}. Run init first.",
                self.mirror_path.display()
            )),
            TargetStatus::MissingSkillsDir => Some(format!(
                "No {} directory in {}",
                VENDOR_SKILLS_DIR,
                self.mirror_path.display()
            )),
            TargetStatus::MissingSource => Some(format!(
                "Skill not found: {}",
                self.source_path.display()
            )),
        }
    }
}

/// Everything the diff engine and reconciler need to know about the tree.
#[derive(Debug, Clone, Default)]
pub struct Observation {
    /// Declared mirrors, in registry order.
    pub mirrors: Vec<ObservedMirrorState>,
    /// Every mirror path registered in git metadata.
    pub registered: BTreeSet<String>,
    /// Output directory names under `skills/`, hidden entries excluded.
    pub outputs: BTreeSet<String>,
    pub extra_mirror_paths: Vec<String>,
    pub extra_output_names: Vec<String>,
    pub vendor_targets: Vec<VendorTarget>,
    /// Non-fatal observations already logged as warnings.
    pub warnings: Vec<String>,
}

impl Observation {
    pub fn mirror(&self, path: &str) -> Option<&ObservedMirrorState> {
        self.mirrors.iter().find(|m| m.path == path)
    }
}

/// Inspects the working tree through the git and filesystem capabilities.
pub struct Observer<'a> {
    git: &'a dyn GitOperations,
    fs: &'a dyn FileSystem,
}

impl<'a> Observer<'a> {
    pub fn new(git: &'a dyn GitOperations, fs: &'a dyn FileSystem) -> Self {
        Self { git, fs }
    }

    /// Observe the tree against `registry`.
    ///
    /// Fails only when git metadata or the output root cannot be read.
    pub fn observe(&self, registry: &Registry, depth: ObserveDepth) -> Result<Observation> {
        let mut observation = Observation {
            registered: self
                .git
                .registered_mirrors()?
                .iter()
                .map(|path| normalize_mirror_path(path))
                .collect(),
            outputs: self.list_outputs()?,
            ..Observation::default()
        };

        for spec in registry.mirrors() {
            let state = self.observe_mirror(
                &spec.name,
                spec.kind,
                &spec.local_path,
                &observation.registered,
                depth,
                &mut observation.warnings,
            );
            observation.mirrors.push(state);
        }

        for (vendor, vendor_spec) in &registry.vendors {
            for (source_name, output_name) in &vendor_spec.skills {
                let target = self.resolve_target(vendor, source_name, output_name);
                // reported by the caller; a later re-observation may resolve it
                if let Some(problem) = target.problem() {
                    observation.warnings.push(problem);
                }
                observation.vendor_targets.push(target);
            }
        }

        observation.extra_mirror_paths =
            diff::mirrors_to_remove(&registry.mirror_paths(), &observation.registered);
        observation.extra_output_names =
            diff::outputs_to_remove(&registry.expected_outputs(), &observation.outputs);

        Ok(observation)
    }

    fn list_outputs(&self) -> Result<BTreeSet<String>> {
        let skills = Path::new(SKILLS_DIR);
        if !self.fs.is_dir(skills) {
            return Ok(BTreeSet::new());
        }
        Ok(self
            .fs
            .list_dir(skills)?
            .into_iter()
            .filter(|entry| entry.is_dir && !entry.name.starts_with('.'))
            .map(|entry| entry.name)
            .collect())
    }

    fn observe_mirror(
        &self,
        name: &str,
        kind: MirrorKind,
        path: &str,
        registered: &BTreeSet<String>,
        depth: ObserveDepth,
        warnings: &mut Vec<String>,
    ) -> ObservedMirrorState {
        let is_registered = registered.contains(path);
        let checked_out = self.is_checkout(Path::new(path));

        let head_revision = if checked_out {
            self.git.head_revision(path).unwrap_or_else(|e| {
                debug!("cannot read HEAD of {}: {}", path, e);
                None
            })
        } else {
            None
        };

        let behind = if depth == ObserveDepth::Upstream && is_registered && checked_out {
            self.upstream_distance(path, warnings)
        } else {
            BehindCount::Unknown
        };

        ObservedMirrorState {
            name: name.to_string(),
            kind,
            path: path.to_string(),
            registered: is_registered,
            checked_out,
            behind,
            head_revision,
        }
    }

    /// Git queries inside a directory without its own `.git` entry would
    /// answer for the enclosing superproject.
    fn is_checkout(&self, path: &Path) -> bool {
        self.fs.exists(&path.join(GIT_DIR_NAME))
    }

    fn upstream_distance(&self, path: &str, warnings: &mut Vec<String>) -> BehindCount {
        if let Err(e) = self.git.fetch(path) {
            let message = format!("Failed to fetch {}: {}", path, e);
            warn!("{}", message);
            warnings.push(message);
            return BehindCount::Unknown;
        }

        match self.git.commits_behind(path) {
            Ok(Some(count)) => BehindCount::Known(count),
            Ok(None) => {
                let message = format!("No upstream tracking information for {}", path);
                warn!("{}", message);
                warnings.push(message);
                BehindCount::Unknown
            }
            Err(e) => {
                let message = format!("Cannot compare {} with upstream: {}", path, e);
                warn!("{}", message);
                warnings.push(message);
                BehindCount::Unknown
            }
        }
    }

    fn resolve_target(&self, vendor: &str, source_name: &str, output_name: &str) -> VendorTarget {
        let mirror_path = Path::new(MirrorKind::Vendor.root_dir()).join(vendor);
        let skills_dir = mirror_path.join(VENDOR_SKILLS_DIR);
        let source_path = skills_dir.join(source_name);

        let status = if !self.is_checkout(&mirror_path) {
            TargetStatus::MissingMirror
        } else if !self.fs.is_dir(&skills_dir) {
            TargetStatus::MissingSkillsDir
        } else if !self.fs.is_dir(&source_path) {
            TargetStatus::MissingSource
        } else {
            TargetStatus::Ready
        };

        VendorTarget {
            vendor: vendor.to_string(),
            source_name: source_name.to_string(),
            output_name: output_name.to_string(),
            mirror_path,
            source_path,
            output_path: Path::new(SKILLS_DIR).join(output_name),
            status,
        }
    }
}
