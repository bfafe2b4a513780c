//! # skill-sync Library
//!
//! Reconciles a declared set of upstream mirrors (git submodules under
//! `sources/` and `vendor/`) and the output directories generated from them
//! (`skills/`) against the actual state of a working tree. It is used by the
//! `skill-sync` command-line tool but the engine works against injected
//! capabilities and can be driven from anywhere.
//!
//! ## Quick Example
//!
//! ```
//! use skill_sync::config;
//! use skill_sync::filesystem::MemoryFS;
//!
//! let registry = config::parse(r#"
//! sources:
//!   widgets: https://github.com/acme/widgets
//! vendors:
//!   ui:
//!     source: https://github.com/acme/ui
//!     skills:
//!       button: ui-button
//! manual:
//!   - commit-message
//! "#).unwrap();
//!
//! let expected: Vec<String> = registry.expected_outputs().into_iter().collect();
//! assert_eq!(expected, ["commit-message", "ui-button", "widgets"]);
//!
//! let fs = MemoryFS::new();
//! fs.add_file_string("skills/commit-message/SKILL.md", "# Commits").unwrap();
//! assert_eq!(fs.len(), 1);
//! ```
//!
//! ## Core Concepts
//!
//! - **Registry (`config`)**: the declared desired state, parsed from
//!   `.skill-sync.yaml`.
//! - **Capabilities (`repository`, `filesystem`, `prompt`)**: version control,
//!   storage and user confirmation behind traits, so the engine can run against
//!   the real tree or against in-memory doubles.
//! - **Observer (`observer`)**: reads git metadata and the tree into an
//!   [`observer::Observation`].
//! - **Diff Engine (`diff`)**: pure set differences between registry and
//!   observation.
//! - **Reconciler (`reconciler`)**: applies the differences, asking before
//!   anything destructive.
//! - **Provenance (`provenance`)**: the `SYNC.md` sidecar and license carried
//!   into every regenerated output.
//!
//! ## Execution Flow
//!
//! 1. Parse and validate the registry.
//! 2. Observe the working tree (optionally fetching upstream metadata).
//! 3. Compute the plan.
//! 4. Confirm destructive steps.
//! 5. Apply: mirror removals first, then additions, updates and regeneration.

pub mod config;
pub mod defaults;
pub mod diff;
pub mod error;
pub mod filesystem;
pub mod git;
pub mod observer;
pub mod output;
pub mod prompt;
pub mod provenance;
pub mod reconciler;
pub mod repository;

#[cfg(test)]
mod diff_proptest;
#[cfg(test)]
mod test_support;
