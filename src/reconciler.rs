//! # Reconciler
//!
//! Applies the differences computed by [`crate::diff`] through four
//! primitives: register a mirror, deregister a mirror, regenerate an output,
//! remove an output. The entry operations combine them:
//!
//! - [`Reconciler::initialize`]: remove extra mirrors, then add missing ones.
//! - [`Reconciler::synchronize`]: update every registered mirror, then
//!   regenerate every vendor output with a provenance sidecar.
//! - [`Reconciler::check`]: read-only report of upstream drift.
//! - [`Reconciler::cleanup`]: remove extra mirrors, then extra outputs.
//!
//! Destructive steps ask the injected [`Prompt`] first. Per-item failures are
//! logged and recorded in the report; the batch continues. Only environment
//! failures (metadata unreadable, a parent directory cannot be created) abort
//! with an `Err`.

use std::path::Path;

use chrono::{Local, NaiveDate};
use log::{info, warn};
use serde::Serialize;

use crate::config::{MirrorKind, Registry};
use crate::defaults::{BACKUP_PREFIX, SKILLS_DIR, STAGING_PREFIX};
use crate::diff::{Plan, UpdateAvailable};
use crate::error::{Error, Result};
use crate::filesystem::{copy_tree, remove_dir_if_exists, FileSystem};
use crate::observer::{ObserveDepth, Observation, Observer, VendorTarget};
use crate::prompt::Prompt;
use crate::provenance::{self, ProvenanceRecord};
use crate::repository::GitOperations;

/// Result of an operation that asks the user for confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Completed(T),
    /// The user cancelled a prompt. Steps finished before the prompt stay done.
    Cancelled,
}

impl<T> Outcome<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(report) => Some(report),
            Outcome::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }
}

/// One item of a batch that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub item: String,
    pub reason: String,
}

impl ItemFailure {
    fn new(item: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            item: item.into(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    /// Extra mirrors deregistered.
    pub removed: Vec<String>,
    /// Extra mirrors the user chose to keep.
    pub kept: Vec<String>,
    pub added: Vec<String>,
    /// Registered mirrors that had no working copy and were checked out.
    pub checked_out: Vec<String>,
    /// Missing mirrors left out of the selection.
    pub skipped: Vec<String>,
    /// Declared mirrors that were registered and checked out before this run.
    pub already_present: Vec<String>,
    pub failures: Vec<ItemFailure>,
}

impl InitReport {
    /// Nothing was missing when the run started.
    pub fn all_present(&self) -> bool {
        self.added.is_empty()
            && self.checked_out.is_empty()
            && self.skipped.is_empty()
            && self.failures.is_empty()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// An output written by `synchronize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegeneratedOutput {
    pub output: String,
    pub source_path: String,
    pub revision: Option<String>,
    /// License file carried over from the mirror root.
    pub license: Option<String>,
    pub files: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub updated: Vec<String>,
    /// Declared mirrors that are not registered; run `init` first.
    pub not_initialized: Vec<String>,
    pub regenerated: Vec<RegeneratedOutput>,
    /// Mapping entries whose source is missing.
    pub skipped: Vec<ItemFailure>,
    pub failures: Vec<ItemFailure>,
}

impl SyncReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Why a vendor output no longer reflects its mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleReason {
    /// The output directory does not exist.
    NotGenerated,
    /// The output exists without a readable provenance sidecar.
    MissingProvenance,
    /// The sidecar names a different commit than the mirror has checked out.
    RevisionChanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleOutput {
    pub output: String,
    pub reason: StaleReason,
    pub recorded: Option<String>,
    pub current: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub updates: Vec<UpdateAvailable>,
    /// Present mirrors whose distance to upstream is unknown.
    pub unknown_upstream: Vec<String>,
    /// Declared mirrors that are not registered or not checked out.
    pub not_initialized: Vec<String>,
    pub stale_outputs: Vec<StaleOutput>,
    pub warnings: Vec<String>,
}

impl CheckReport {
    /// Everything known to be current and every output in step.
    pub fn is_up_to_date(&self) -> bool {
        self.updates.is_empty()
            && self.unknown_upstream.is_empty()
            && self.not_initialized.is_empty()
            && self.stale_outputs.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization {
            message: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed_mirrors: Vec<String>,
    pub removed_outputs: Vec<String>,
    /// Extra items the user declined to remove.
    pub kept: Vec<String>,
    pub failures: Vec<ItemFailure>,
}

impl CleanupReport {
    /// Nothing extra was found.
    pub fn is_clean(&self) -> bool {
        self.removed_mirrors.is_empty()
            && self.removed_outputs.is_empty()
            && self.kept.is_empty()
            && self.failures.is_empty()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Outcome of one confirmation-gated removal batch.
enum Gate {
    Proceed,
    Cancelled,
}

pub struct Reconciler<'a> {
    registry: &'a Registry,
    git: &'a dyn GitOperations,
    fs: &'a dyn FileSystem,
    sync_date: NaiveDate,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        registry: &'a Registry,
        git: &'a dyn GitOperations,
        fs: &'a dyn FileSystem,
    ) -> Self {
        Self {
            registry,
            git,
            fs,
            sync_date: Local::now().date_naive(),
        }
    }

    /// Date stamped into provenance sidecars. Defaults to today.
    pub fn with_sync_date(mut self, date: NaiveDate) -> Self {
        self.sync_date = date;
        self
    }

    pub fn observe(&self, depth: ObserveDepth) -> Result<Observation> {
        Observer::new(self.git, self.fs).observe(self.registry, depth)
    }

    /// Remove extra mirrors, then register the missing ones the user selects.
    pub fn initialize(&self, prompt: &dyn Prompt) -> Result<Outcome<InitReport>> {
        let observation = self.observe(ObserveDepth::Local)?;
        let plan = Plan::compute(self.registry, &observation);
        let mut report = InitReport::default();

        if let Gate::Cancelled = self.remove_extra_mirrors(
            prompt,
            &plan.mirrors_to_remove,
            &mut report.removed,
            &mut report.kept,
            &mut report.failures,
        )? {
            return Ok(Outcome::Cancelled);
        }

        report.already_present = observation
            .mirrors
            .iter()
            .filter(|m| m.registered && m.checked_out)
            .map(|m| m.path.clone())
            .collect();

        // registered but never checked out, e.g. after a non-recursive clone
        let without_copy = observation
            .mirrors
            .iter()
            .filter(|m| m.registered && !m.checked_out);
        for mirror in without_copy {
            info!("Checking out mirror {}", mirror.path);
            match self.git.checkout_mirror(&mirror.path) {
                Ok(()) => report.checked_out.push(mirror.path.clone()),
                Err(e) => {
                    warn!("Failed to check out {}: {}", mirror.path, e);
                    report.failures.push(ItemFailure::new(mirror.path.clone(), e));
                }
            }
        }

        if plan.mirrors_to_add.is_empty() {
            info!("All mirrors already present");
            return Ok(Outcome::Completed(report));
        }

        let labels: Vec<String> = plan
            .mirrors_to_add
            .iter()
            .map(|m| format!("{} - {}", m.label(), m.url))
            .collect();
        let Some(selected) = prompt.multi_select("Select mirrors to add", &labels)? else {
            return Ok(Outcome::Cancelled);
        };

        for (index, spec) in plan.mirrors_to_add.iter().enumerate() {
            if !selected.contains(&index) {
                report.skipped.push(spec.local_path.clone());
                continue;
            }

            self.fs.create_dir_all(Path::new(spec.kind.root_dir()))?;

            info!("Adding mirror {}", spec.local_path);
            match self.git.add_mirror(&spec.url, &spec.local_path) {
                Ok(()) => report.added.push(spec.local_path.clone()),
                Err(e) => {
                    warn!("Failed to add {}: {}", spec.local_path, e);
                    report
                        .failures
                        .push(ItemFailure::new(spec.local_path.clone(), e));
                }
            }
        }

        Ok(Outcome::Completed(report))
    }

    /// Update every registered mirror, then regenerate every vendor output.
    pub fn synchronize(&self) -> Result<SyncReport> {
        let observation = self.observe(ObserveDepth::Local)?;
        let mut report = SyncReport::default();

        for mirror in &observation.mirrors {
            if !mirror.registered {
                warn!("{} is not initialized; run init first", mirror.path);
                report.not_initialized.push(mirror.path.clone());
                continue;
            }

            info!("Updating {}", mirror.path);
            match self.git.update_mirror(&mirror.path) {
                Ok(()) => report.updated.push(mirror.path.clone()),
                Err(e) => {
                    warn!("Failed to update {}: {}", mirror.path, e);
                    report.failures.push(ItemFailure::new(mirror.path.clone(), e));
                }
            }
        }

        // mirror content and heads changed
        let observation = self.observe(ObserveDepth::Local)?;
        if !observation.vendor_targets.is_empty() {
            self.fs.create_dir_all(Path::new(SKILLS_DIR))?;
        }

        for target in &observation.vendor_targets {
            if let Some(problem) = target.problem() {
                warn!("Skipping {}: {}", target.output_name, problem);
                report
                    .skipped
                    .push(ItemFailure::new(target.output_name.clone(), problem));
                continue;
            }

            let revision = observation
                .mirror(&vendor_mirror_path(target))
                .and_then(|m| m.head_revision.clone());

            match self.regenerate_output(target, revision) {
                Ok(output) => {
                    info!(
                        "Synced {} -> {} ({} files)",
                        output.source_path, target.output_name, output.files
                    );
                    report.regenerated.push(output);
                }
                Err(e) => {
                    warn!("Failed to regenerate {}: {}", target.output_name, e);
                    report
                        .failures
                        .push(ItemFailure::new(target.output_name.clone(), e));
                }
            }
        }

        Ok(report)
    }

    /// Read-only drift report. Fetches remote metadata for every mirror.
    pub fn check(&self) -> Result<CheckReport> {
        let observation = self.observe(ObserveDepth::Upstream)?;
        let plan = Plan::compute(self.registry, &observation);

        let not_initialized = observation
            .mirrors
            .iter()
            .filter(|m| !m.registered || !m.checked_out)
            .map(|m| m.path.clone())
            .collect();

        let stale_outputs = observation
            .vendor_targets
            .iter()
            .filter_map(|target| self.staleness(&observation, target))
            .collect();

        Ok(CheckReport {
            updates: plan.updates_available,
            unknown_upstream: plan.unknown_upstream,
            not_initialized,
            stale_outputs,
            warnings: observation.warnings,
        })
    }

    /// Remove extra mirrors, then extra outputs, each after confirmation.
    pub fn cleanup(&self, prompt: &dyn Prompt) -> Result<Outcome<CleanupReport>> {
        let observation = self.observe(ObserveDepth::Local)?;
        let plan = Plan::compute(self.registry, &observation);
        let mut report = CleanupReport::default();

        if !plan.has_removals() {
            info!("Everything is clean, no unused mirrors or outputs found");
            return Ok(Outcome::Completed(report));
        }

        if let Gate::Cancelled = self.remove_extra_mirrors(
            prompt,
            &plan.mirrors_to_remove,
            &mut report.removed_mirrors,
            &mut report.kept,
            &mut report.failures,
        )? {
            return Ok(Outcome::Cancelled);
        }

        if let Gate::Cancelled =
            self.remove_extra_outputs(prompt, &plan.outputs_to_remove, &mut report)?
        {
            return Ok(Outcome::Cancelled);
        }

        Ok(Outcome::Completed(report))
    }

    fn remove_extra_mirrors(
        &self,
        prompt: &dyn Prompt,
        paths: &[String],
        removed: &mut Vec<String>,
        kept: &mut Vec<String>,
        failures: &mut Vec<ItemFailure>,
    ) -> Result<Gate> {
        if paths.is_empty() {
            return Ok(Gate::Proceed);
        }

        warn!(
            "Found {} mirror(s) not in the registry: {}",
            paths.len(),
            paths.join(", ")
        );
        match prompt.confirm("Remove these extra mirrors?")? {
            None => return Ok(Gate::Cancelled),
            Some(false) => {
                kept.extend(paths.iter().cloned());
                return Ok(Gate::Proceed);
            }
            Some(true) => {}
        }

        for path in paths {
            info!("Removing mirror {}", path);
            match self.git.remove_mirror(path) {
                Ok(()) => removed.push(path.clone()),
                Err(e) => {
                    warn!("Failed to remove {}: {}", path, e);
                    failures.push(ItemFailure::new(path.clone(), e));
                }
            }
        }
        Ok(Gate::Proceed)
    }

    fn remove_extra_outputs(
        &self,
        prompt: &dyn Prompt,
        names: &[String],
        report: &mut CleanupReport,
    ) -> Result<Gate> {
        if names.is_empty() {
            return Ok(Gate::Proceed);
        }

        warn!(
            "Found {} output(s) not in the registry: {}",
            names.len(),
            names.join(", ")
        );
        match prompt.confirm("Remove these extra outputs?")? {
            None => return Ok(Gate::Cancelled),
            Some(false) => {
                report
                    .kept
                    .extend(names.iter().map(|n| format!("{}/{}", SKILLS_DIR, n)));
                return Ok(Gate::Proceed);
            }
            Some(true) => {}
        }

        for name in names {
            let path = Path::new(SKILLS_DIR).join(name);
            info!("Removing output {}", path.display());
            match self.fs.remove_dir_all(&path) {
                Ok(()) => report.removed_outputs.push(name.clone()),
                Err(e) => {
                    warn!("Failed to remove {}: {}", path.display(), e);
                    report
                        .failures
                        .push(ItemFailure::new(format!("{}/{}", SKILLS_DIR, name), e));
                }
            }
        }
        Ok(Gate::Proceed)
    }

    /// Full replace of one output: stage a fresh copy beside the output, move
    /// the old output aside, then swap the staged copy in. The previous
    /// content is restored if the swap fails.
    fn regenerate_output(
        &self,
        target: &VendorTarget,
        revision: Option<String>,
    ) -> Result<RegeneratedOutput> {
        let staging =
            Path::new(SKILLS_DIR).join(format!("{}{}", STAGING_PREFIX, target.output_name));
        let backup =
            Path::new(SKILLS_DIR).join(format!("{}{}", BACKUP_PREFIX, target.output_name));
        remove_dir_if_exists(self.fs, &staging)?;
        remove_dir_if_exists(self.fs, &backup)?;

        let source_path = target.source_path.to_string_lossy().replace('\\', "/");
        let staged = self.stage(target, &staging, &source_path, revision.clone());
        let (files, license) = match staged {
            Ok(staged) => staged,
            Err(e) => {
                self.discard(&staging);
                return Err(e);
            }
        };

        let had_previous = self.fs.is_dir(&target.output_path);
        if had_previous {
            if let Err(e) = self.fs.rename(&target.output_path, &backup) {
                self.discard(&staging);
                return Err(e);
            }
        }

        if let Err(e) = self.fs.rename(&staging, &target.output_path) {
            if had_previous {
                if let Err(restore) = self.fs.rename(&backup, &target.output_path) {
                    warn!(
                        "Cannot restore {} from {}: {}",
                        target.output_path.display(),
                        backup.display(),
                        restore
                    );
                }
            }
            self.discard(&staging);
            return Err(e);
        }

        if had_previous {
            self.discard(&backup);
        }

        Ok(RegeneratedOutput {
            output: target.output_name.clone(),
            source_path,
            revision,
            license,
            files,
        })
    }

    /// Remove a hidden working directory, logging it when it has to stay.
    fn discard(&self, path: &Path) {
        if let Err(e) = remove_dir_if_exists(self.fs, path) {
            warn!("Leaving {} behind: {}", path.display(), e);
        }
    }

    fn stage(
        &self,
        target: &VendorTarget,
        staging: &Path,
        source_path: &str,
        revision: Option<String>,
    ) -> Result<(usize, Option<String>)> {
        let files = copy_tree(self.fs, &target.source_path, staging)?;
        let license = provenance::copy_license(self.fs, &target.mirror_path, staging)?;
        let record = ProvenanceRecord {
            source_path: source_path.to_string(),
            revision,
            synced_at: self.sync_date,
        };
        provenance::write(self.fs, staging, &record)?;
        Ok((files, license))
    }

    fn staleness(&self, observation: &Observation, target: &VendorTarget) -> Option<StaleOutput> {
        let current = observation
            .mirror(&vendor_mirror_path(target))
            .and_then(|m| m.head_revision.clone());
        let stale = |reason, recorded| {
            Some(StaleOutput {
                output: target.output_name.clone(),
                reason,
                recorded,
                current: current.clone(),
            })
        };

        if !self.fs.is_dir(&target.output_path) {
            return stale(StaleReason::NotGenerated, None);
        }

        let record = match provenance::read(self.fs, &target.output_path) {
            Ok(Some(record)) => record,
            Ok(None) => return stale(StaleReason::MissingProvenance, None),
            Err(e) => {
                warn!(
                    "Cannot read provenance of {}: {}",
                    target.output_path.display(),
                    e
                );
                return stale(StaleReason::MissingProvenance, None);
            }
        };

        if current.is_some() && record.revision != current {
            return stale(StaleReason::RevisionChanged, record.revision);
        }
        None
    }
}

fn vendor_mirror_path(target: &VendorTarget) -> String {
    format!("{}/{}", MirrorKind::Vendor.root_dir(), target.vendor)
}
