//! # Diff Engine
//!
//! Pure set differences between the declared registry and an
//! [`Observation`]. Nothing here touches git or the filesystem.
//!
//! | set                  | meaning                                             |
//! |----------------------|-----------------------------------------------------|
//! | `mirrors_to_add`     | declared, not registered                            |
//! | `mirrors_to_remove`  | registered, not declared                            |
//! | `outputs_to_remove`  | present under `skills/`, not expected               |
//! | `updates_available`  | declared mirrors behind upstream by a known `n > 0` |
//! | `unknown_upstream`   | present mirrors whose distance could not be known   |
//!
//! Every result is sorted by path or name.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::{MirrorKind, MirrorSpec, Registry};
use crate::observer::{BehindCount, ObservedMirrorState, Observation};

/// Declared mirrors that git metadata does not know about.
pub fn mirrors_to_add(declared: &[MirrorSpec], registered: &BTreeSet<String>) -> Vec<MirrorSpec> {
    let mut missing: Vec<MirrorSpec> = declared
        .iter()
        .filter(|spec| !registered.contains(&spec.local_path))
        .cloned()
        .collect();
    missing.sort_by(|a, b| a.local_path.cmp(&b.local_path));
    missing
}

/// Registered mirror paths that nothing declares.
pub fn mirrors_to_remove(
    declared: &BTreeSet<String>,
    registered: &BTreeSet<String>,
) -> Vec<String> {
    registered.difference(declared).cloned().collect()
}

/// Output names on disk that are not expected.
pub fn outputs_to_remove(expected: &BTreeSet<String>, on_disk: &BTreeSet<String>) -> Vec<String> {
    on_disk.difference(expected).cloned().collect()
}

/// A declared mirror with upstream commits it does not have yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateAvailable {
    pub name: String,
    pub kind: MirrorKind,
    pub path: String,
    pub behind: u32,
    /// Outputs regenerated from this mirror on the next sync (vendors only).
    pub outputs: Vec<String>,
}

/// Mirrors that are behind by a known, non-zero count.
pub fn updates_available(
    registry: &Registry,
    mirrors: &[ObservedMirrorState],
) -> Vec<UpdateAvailable> {
    let mut updates: Vec<UpdateAvailable> = mirrors
        .iter()
        .filter_map(|mirror| match mirror.behind {
            BehindCount::Known(n) if n > 0 => Some(UpdateAvailable {
                name: mirror.name.clone(),
                kind: mirror.kind,
                path: mirror.path.clone(),
                behind: n,
                outputs: mapped_outputs(registry, mirror),
            }),
            _ => None,
        })
        .collect();
    updates.sort_by(|a, b| a.path.cmp(&b.path));
    updates
}

fn mapped_outputs(registry: &Registry, mirror: &ObservedMirrorState) -> Vec<String> {
    match mirror.kind {
        MirrorKind::Source => Vec::new(),
        MirrorKind::Vendor => registry
            .vendor(&mirror.name)
            .map(|vendor| {
                let outputs: BTreeSet<&String> = vendor.skills.values().collect();
                outputs.into_iter().cloned().collect()
            })
            .unwrap_or_default(),
    }
}

/// Present mirrors whose behind count is unknown.
pub fn unknown_upstream(mirrors: &[ObservedMirrorState]) -> Vec<String> {
    let mut paths: Vec<String> = mirrors
        .iter()
        .filter(|m| m.registered && m.checked_out && m.behind == BehindCount::Unknown)
        .map(|m| m.path.clone())
        .collect();
    paths.sort();
    paths
}

/// All differences for one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub mirrors_to_add: Vec<MirrorSpec>,
    pub mirrors_to_remove: Vec<String>,
    pub outputs_to_remove: Vec<String>,
    pub updates_available: Vec<UpdateAvailable>,
    pub unknown_upstream: Vec<String>,
}

impl Plan {
    pub fn compute(registry: &Registry, observation: &Observation) -> Self {
        Self {
            mirrors_to_add: mirrors_to_add(&registry.mirrors(), &observation.registered),
            mirrors_to_remove: mirrors_to_remove(&registry.mirror_paths(), &observation.registered),
            outputs_to_remove: outputs_to_remove(
                &registry.expected_outputs(),
                &observation.outputs,
            ),
            updates_available: updates_available(registry, &observation.mirrors),
            unknown_upstream: unknown_upstream(&observation.mirrors),
        }
    }

    /// Nothing extra to delete.
    pub fn has_removals(&self) -> bool {
        !self.mirrors_to_remove.is_empty() || !self.outputs_to_remove.is_empty()
    }
}
