//! Provenance sidecar and license carry-over for regenerated outputs.
//!
//! Every output produced by `sync` gets a `SYNC.md` recording where it came
//! from, which mirror commit it reflects and when it was written, so an output
//! directory can be traced back without consulting any other state. The
//! mirror's license, if it has one, travels with it as `LICENSE.md`.

use std::path::Path;

use chrono::NaiveDate;
use log::debug;
use regex::Regex;

use crate::defaults::{LICENSE_CANDIDATES, LICENSE_FILENAME, PROVENANCE_FILENAME};
use crate::error::Result;
use crate::filesystem::FileSystem;

const UNKNOWN_REVISION: &str = "unknown";

/// Where an output came from and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenanceRecord {
    /// Root-relative path of the copied sub-resource, e.g. `vendor/ui/skills/button`.
    pub source_path: String,
    /// Mirror commit at sync time; `None` when it could not be determined.
    pub revision: Option<String>,
    pub synced_at: NaiveDate,
}

impl ProvenanceRecord {
    pub fn render(&self) -> String {
        format!(
            "# Sync Info\n\
             \n\
             - **Source:** `{}`\n\
             - **Git SHA:** `{}`\n\
             - **Synced:** {}\n",
            self.source_path,
            self.revision.as_deref().unwrap_or(UNKNOWN_REVISION),
            self.synced_at.format("%Y-%m-%d"),
        )
    }

    /// Parse a rendered sidecar. `None` if any field is missing.
    pub fn parse(content: &str) -> Option<Self> {
        let field = |label: &str| -> Option<String> {
            let re = Regex::new(&format!(r"(?m)^- \*\*{}:\*\* `?([^`\n]+?)`?\s*$", label)).ok()?;
            re.captures(content).map(|caps| caps[1].to_string())
        };

        let source_path = field("Source")?;
        let revision = field("Git SHA")?;
        let synced_at = NaiveDate::parse_from_str(&field("Synced")?, "%Y-%m-%d").ok()?;

        Some(Self {
            source_path,
            revision: (revision != UNKNOWN_REVISION).then_some(revision),
            synced_at,
        })
    }
}

/// Write (or overwrite) the sidecar inside `output_dir`.
pub fn write(fs: &dyn FileSystem, output_dir: &Path, record: &ProvenanceRecord) -> Result<()> {
    fs.write(
        &output_dir.join(PROVENANCE_FILENAME),
        record.render().as_bytes(),
    )
}

/// Read the sidecar from `output_dir`, if present and well-formed.
pub fn read(fs: &dyn FileSystem, output_dir: &Path) -> Result<Option<ProvenanceRecord>> {
    let path = output_dir.join(PROVENANCE_FILENAME);
    if !fs.exists(&path) {
        return Ok(None);
    }
    let content = fs.read(&path)?;
    let record = ProvenanceRecord::parse(&String::from_utf8_lossy(&content));
    if record.is_none() {
        debug!("unparsable provenance sidecar at {}", path.display());
    }
    Ok(record)
}

/// Name of the first license file in `mirror_root`, matched case-insensitively
/// in [`LICENSE_CANDIDATES`] order.
pub fn find_license(fs: &dyn FileSystem, mirror_root: &Path) -> Result<Option<String>> {
    let files: Vec<String> = fs
        .list_dir(mirror_root)?
        .into_iter()
        .filter(|entry| !entry.is_dir)
        .map(|entry| entry.name)
        .collect();

    Ok(LICENSE_CANDIDATES.iter().find_map(|candidate| {
        files
            .iter()
            .find(|name| name.eq_ignore_ascii_case(candidate))
            .cloned()
    }))
}

/// Copy the mirror's license into `output_dir` as `LICENSE.md`.
///
/// Returns the name of the copied file, or `None` if the mirror has none.
pub fn copy_license(
    fs: &dyn FileSystem,
    mirror_root: &Path,
    output_dir: &Path,
) -> Result<Option<String>> {
    let Some(name) = find_license(fs, mirror_root)? else {
        return Ok(None);
    };
    fs.copy_file(&mirror_root.join(&name), &output_dir.join(LICENSE_FILENAME))?;
    Ok(Some(name))
}
