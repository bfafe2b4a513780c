//! # Registry Schema and Parsing
//!
//! This module defines the declared desired state: the `.skill-sync.yaml`
//! registry. A registry has three independent sections:
//!
//! - **`sources`**: mirrors tracked verbatim, `name -> url`. Each one lives at
//!   `sources/<name>` and owns the output `skills/<name>`.
//! - **`vendors`**: mirrors from which selected sub-resources are extracted,
//!   `name -> { source, skills: { sub-resource -> output name } }`. Each one
//!   lives at `vendor/<name>`.
//! - **`manual`**: hand-written outputs under `skills/` that have no mirror.
//!
//! ```yaml
//! sources:
//!   widgets: https://github.com/acme/widgets
//! vendors:
//!   ui:
//!     source: https://github.com/acme/ui
//!     skills:
//!       button: ui-button
//! manual:
//!   - commit-message
//! ```
//!
//! The registry is parsed once per invocation, validated, and then passed by
//! reference into every operation. Nothing in the crate looks it up globally.

use crate::defaults::{SOURCES_DIR, VENDOR_DIR};
use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Component, Path};

/// Mapping from a sub-resource path inside a vendor mirror to an output name.
pub type VendorMapping = BTreeMap<String, String>;

/// The parsed registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Registry {
    /// Source mirrors, `name -> url`.
    #[serde(default)]
    pub sources: BTreeMap<String, String>,
    /// Vendor mirrors keyed by name.
    #[serde(default)]
    pub vendors: BTreeMap<String, VendorSpec>,
    /// Manually maintained output names.
    #[serde(default)]
    pub manual: Vec<String>,
}

/// A vendor mirror declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VendorSpec {
    /// Remote URL of the vendor repository.
    pub source: String,
    /// Whether the vendor is the upstream project's own skill set.
    ///
    /// Informational only; it does not change reconciliation.
    #[serde(default)]
    pub official: bool,
    /// Sub-resources to extract, keyed by their path under `<mirror>/skills/`.
    #[serde(default)]
    pub skills: VendorMapping,
}

/// Which partition a mirror belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorKind {
    Source,
    Vendor,
}

impl MirrorKind {
    /// Root directory under which mirrors of this kind are checked out.
    pub fn root_dir(self) -> &'static str {
        match self {
            MirrorKind::Source => SOURCES_DIR,
            MirrorKind::Vendor => VENDOR_DIR,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MirrorKind::Source => "source",
            MirrorKind::Vendor => "vendor",
        }
    }
}

impl fmt::Display for MirrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single declared mirror, flattened out of the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MirrorSpec {
    pub name: String,
    pub url: String,
    pub kind: MirrorKind,
    /// Root-relative checkout path, e.g. `vendor/ui`.
    pub local_path: String,
}

impl MirrorSpec {
    pub fn new(kind: MirrorKind, name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            kind,
            local_path: format!("{}/{}", kind.root_dir(), name),
        }
    }

    /// Label shown in prompts and reports, e.g. `ui (vendor)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.kind)
    }
}

impl Registry {
    /// All declared mirrors: sources first, then vendors, each sorted by name.
    pub fn mirrors(&self) -> Vec<MirrorSpec> {
        let sources = self
            .sources
            .iter()
            .map(|(name, url)| MirrorSpec::new(MirrorKind::Source, name, url));
        let vendors = self
            .vendors
            .iter()
            .map(|(name, vendor)| MirrorSpec::new(MirrorKind::Vendor, name, &vendor.source));
        sources.chain(vendors).collect()
    }

    /// Local paths of all declared mirrors.
    pub fn mirror_paths(&self) -> BTreeSet<String> {
        self.mirrors().into_iter().map(|m| m.local_path).collect()
    }

    /// The set of output names that must never be treated as extra.
    ///
    /// Source names, every vendor mapping's output names and the manual list.
    pub fn expected_outputs(&self) -> BTreeSet<String> {
        let mut expected: BTreeSet<String> = self.sources.keys().cloned().collect();
        for vendor in self.vendors.values() {
            expected.extend(vendor.skills.values().cloned());
        }
        expected.extend(self.manual.iter().cloned());
        expected
    }

    /// Look up a vendor declaration by name.
    pub fn vendor(&self, name: &str) -> Option<&VendorSpec> {
        self.vendors.get(name)
    }

    /// Whether the registry declares nothing at all.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.vendors.is_empty() && self.manual.is_empty()
    }

    /// Check names, URLs and output uniqueness.
    pub fn validate(&self) -> Result<()> {
        // output name -> entry that claims it
        // only vendor mappings write outputs; sources and manual names just
        // mark outputs as expected and may overlap with anything
        let mut claimed: BTreeMap<&str, String> = BTreeMap::new();

        for (name, url) in &self.sources {
            let entry = format!("sources.{}", name);
            check_component(&entry, name)?;
            check_remote(&entry, url)?;
        }

        for (name, vendor) in &self.vendors {
            let entry = format!("vendors.{}", name);
            check_component(&entry, name)?;
            check_remote(&entry, &vendor.source)?;
            for (source, output) in &vendor.skills {
                let mapping = format!("{}.skills.{}", entry, source);
                check_relative(&mapping, source)?;
                check_component(&mapping, output)?;
                claim(&mut claimed, output, mapping)?;
            }
        }

        for name in &self.manual {
            let entry = format!("manual.{}", name);
            check_component(&entry, name)?;
        }

        Ok(())
    }
}

fn claim<'a>(
    claimed: &mut BTreeMap<&'a str, String>,
    output: &'a str,
    owner: String,
) -> Result<()> {
    if let Some(previous) = claimed.get(output) {
        return Err(Error::InvalidRegistry {
            entry: owner,
            message: format!(
                "output 'skills/{}' is already written by {}",
                output, previous
            ),
        });
    }
    claimed.insert(output, owner);
    Ok(())
}

/// A name that becomes a single directory: `sources/<name>`, `skills/<name>`.
fn check_component(entry: &str, name: &str) -> Result<()> {
    let invalid = |message: &str| Error::InvalidRegistry {
        entry: entry.to_string(),
        message: message.to_string(),
    };

    if name.trim().is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.starts_with('.') {
        return Err(invalid("name must not start with '.'"));
    }
    if name.contains(['/', '\\']) {
        return Err(invalid("name must be a single path component"));
    }
    Ok(())
}

/// A path inside a mirror's `skills/` directory.
fn check_relative(entry: &str, path: &str) -> Result<()> {
    let all_normal = Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if path.trim().is_empty() || !all_normal {
        return Err(Error::InvalidRegistry {
            entry: entry.to_string(),
            message: format!("'{}' must be a relative path without '..'", path),
        });
    }
    Ok(())
}

/// Accepts absolute URLs, scp-style `user@host:path`, and local paths.
fn check_remote(entry: &str, remote: &str) -> Result<()> {
    if remote.trim().is_empty() {
        return Err(Error::InvalidRegistry {
            entry: entry.to_string(),
            message: "URL is empty".to_string(),
        });
    }

    if url::Url::parse(remote).is_ok()
        || remote.starts_with('/')
        || remote.starts_with("./")
        || remote.starts_with("../")
    {
        return Ok(());
    }

    let scp = Regex::new(r"^[A-Za-z0-9._-]+@[A-Za-z0-9._-]+:\S+$")?;
    if scp.is_match(remote) {
        return Ok(());
    }

    Err(Error::InvalidRegistry {
        entry: entry.to_string(),
        message: format!("'{}' is not a URL, scp-style remote or local path", remote),
    })
}

/// Parse and validate a registry from YAML.
///
/// An empty or comment-only document is an empty registry.
pub fn parse(yaml_content: &str) -> Result<Registry> {
    let blank = yaml_content.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    });
    if blank {
        return Ok(Registry::default());
    }

    let registry: Registry = serde_yaml::from_str(yaml_content).map_err(|e| {
        let message = e.to_string();
        let hint = if message.contains("unknown field") {
            Some("top-level sections are `sources`, `vendors` and `manual`; vendor entries take `source`, `official` and `skills`".to_string())
        } else if message.contains("missing field `source`") {
            Some("every vendor needs a `source:` URL".to_string())
        } else {
            None
        };
        Error::ConfigParse { message, hint }
    })?;

    registry.validate()?;
    Ok(registry)
}

/// Read, parse and validate a registry file.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Registry> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    parse(&content)
}
