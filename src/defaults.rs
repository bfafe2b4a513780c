//! Default values and fixed layout for skill-sync.
//!
//! This module centralizes the file names and directory partitions shared by
//! the observer, the reconciler and the CLI, so the on-disk layout is defined
//! in exactly one place.

/// Default registry file name, resolved relative to the working-tree root.
pub const DEFAULT_CONFIG_FILENAME: &str = ".skill-sync.yaml";

/// Directory holding source mirrors (`sources/<name>`).
pub const SOURCES_DIR: &str = "sources";

/// Directory holding vendor mirrors (`vendor/<name>`).
pub const VENDOR_DIR: &str = "vendor";

/// Output root for generated and manual skills (`skills/<name>`).
pub const SKILLS_DIR: &str = "skills";

/// Directory inside a vendor mirror that holds its sub-resources.
pub const VENDOR_SKILLS_DIR: &str = "skills";

/// Git metadata file listing registered submodules.
pub const GITMODULES_FILENAME: &str = ".gitmodules";

/// Git metadata entry at the top of a checkout: a directory in a plain
/// repository, a `gitdir:` file in a submodule working copy.
pub const GIT_DIR_NAME: &str = ".git";

/// Provenance sidecar written into every regenerated output.
pub const PROVENANCE_FILENAME: &str = "SYNC.md";

/// Canonical license file name inside an output.
pub const LICENSE_FILENAME: &str = "LICENSE.md";

/// License file names looked up in a mirror root, in priority order.
///
/// Matching is case-insensitive.
pub const LICENSE_CANDIDATES: &[&str] = &["LICENSE", "LICENSE.md", "LICENSE.txt"];

/// Prefix for hidden staging directories under the output root.
pub const STAGING_PREFIX: &str = ".staging-";

/// Prefix for the hidden copy of an output kept while its replacement is
/// swapped in.
pub const BACKUP_PREFIX: &str = ".previous-";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_roots_are_distinct() {
        assert_ne!(SOURCES_DIR, VENDOR_DIR);
        assert_ne!(SOURCES_DIR, SKILLS_DIR);
        assert_ne!(VENDOR_DIR, SKILLS_DIR);
    }

    #[test]
    fn test_staging_prefix_is_hidden() {
        assert!(STAGING_PREFIX.starts_with('.'));
        assert!(BACKUP_PREFIX.starts_with('.'));
        assert_ne!(STAGING_PREFIX, BACKUP_PREFIX);
    }
}
