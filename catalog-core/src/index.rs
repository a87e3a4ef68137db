//! Catalog index generation (index.yaml)
//!
//! The index lists every rulebook in the repository with its known
//! versions, enriched with release metadata (download URL, digest, creation
//! time) when a matching release exists. It is derived state: regenerated
//! wholesale on every run, never edited incrementally.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::manifest::{RulebookManifest, API_VERSION, KIND_RULEBOOK};
use crate::release::ReleaseSource;

/// Kind for the generated index document
pub const KIND_CATALOG_INDEX: &str = "CatalogIndex";

/// Comment header prepended to the serialized index
const INDEX_HEADER: &str = "\
# Cupcake Catalog Index
# This file is auto-generated by `cupcake-catalog index`
# Do not edit manually

";

/// A catalog index (index.yaml)
///
/// Entries use an ordered map so regeneration with unchanged inputs yields
/// byte-identical output (timestamps aside).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogIndex {
    /// API version
    pub api_version: String,

    /// Kind (CatalogIndex)
    pub kind: String,

    /// When the index was generated (RFC 3339)
    pub generated: String,

    /// All rulebook entries keyed by name, newest version first
    pub entries: BTreeMap<String, Vec<IndexEntry>>,
}

/// An entry for a specific rulebook version
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    /// Rulebook name
    pub name: String,

    /// Version string
    pub version: String,

    /// Description
    pub description: String,

    /// Supported harnesses
    pub harnesses: Vec<String>,

    /// Searchable keywords
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Whether this version is deprecated
    #[serde(default)]
    pub deprecated: bool,

    /// When this version was created (release time, or generation time when
    /// no release exists yet)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,

    /// Download URLs for the tarball
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,

    /// Tarball digest. Either the registry-reported content digest or a
    /// placeholder derived from the release tag - see [`placeholder_digest`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl Default for CatalogIndex {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND_CATALOG_INDEX.to_string(),
            generated: Utc::now().to_rfc3339(),
            entries: BTreeMap::new(),
        }
    }
}

impl CatalogIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse index from YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml_ng::from_str(content).context("Failed to parse catalog index YAML")
    }

    /// Serialize to YAML with the auto-generation header
    pub fn to_yaml(&self) -> Result<String> {
        let body = serde_yaml_ng::to_string(self).context("Failed to serialize catalog index")?;
        Ok(format!("{INDEX_HEADER}{body}"))
    }

    /// Write the index to a file, replacing any previous content
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let content = self.to_yaml()?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write index: {}", path.display()))
    }

    /// Get all versions of a rulebook
    pub fn get_versions(&self, name: &str) -> Option<&Vec<IndexEntry>> {
        self.entries.get(name)
    }

    /// Get the latest version of a rulebook
    pub fn get_latest(&self, name: &str) -> Option<&IndexEntry> {
        self.entries.get(name).and_then(|v| v.first())
    }

    /// Get total number of unique rulebooks
    pub fn rulebook_count(&self) -> usize {
        self.entries.len()
    }

    /// Get total number of versions across all rulebooks
    pub fn version_count(&self) -> usize {
        self.entries.values().map(|v| v.len()).sum()
    }
}

/// Release tag for a rulebook version
pub fn release_tag(name: &str, version: &str) -> String {
    format!("{name}-{version}")
}

/// Placeholder digest derived from the release tag.
///
/// NOT a content hash: computing the real digest would require downloading
/// the tarball. Used only when the registry reports no per-asset digest, and
/// must not be treated as a content-integrity guarantee by consumers.
pub fn placeholder_digest(tag: &str) -> String {
    format!("sha256:{:x}", Sha256::digest(tag.as_bytes()))
}

/// Dotted-numeric sort key for a version string.
///
/// Comparison is numeric-positional, never lexicographic: "1.10.0" sorts
/// above "1.2.0". Non-numeric trailing characters in a segment are ignored.
fn version_key(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map(|segment| {
            let digits: String = segment.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().unwrap_or(0)
        })
        .collect()
}

/// Builds the catalog index from local manifests and release metadata
pub struct IndexBuilder<'a> {
    rulebooks_dir: PathBuf,
    source: &'a dyn ReleaseSource,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(rulebooks_dir: impl Into<PathBuf>, source: &'a dyn ReleaseSource) -> Self {
        Self {
            rulebooks_dir: rulebooks_dir.into(),
            source,
        }
    }

    /// Build the index.
    ///
    /// Rulebook directories without a usable manifest are skipped with a
    /// warning. A rulebook without a matching release is still indexed - it
    /// represents a change pending publication.
    pub async fn build(&self) -> Result<CatalogIndex> {
        let mut index = CatalogIndex::new();

        if !self.rulebooks_dir.exists() {
            info!(
                "No rulebooks directory found at {}",
                self.rulebooks_dir.display()
            );
            return Ok(index);
        }

        let releases = self.bulk_listing().await;

        let mut dirs: Vec<PathBuf> = std::fs::read_dir(&self.rulebooks_dir)
            .with_context(|| {
                format!(
                    "Failed to read rulebooks directory: {}",
                    self.rulebooks_dir.display()
                )
            })?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();

        for dir in dirs {
            let Some(entry) = self.build_entry(&dir, &releases).await else {
                continue;
            };
            index.entries.entry(entry.name.clone()).or_default().push(entry);
        }

        // Newest version first within each rulebook
        for versions in index.entries.values_mut() {
            versions.sort_by(|a, b| version_key(&b.version).cmp(&version_key(&a.version)));
        }

        Ok(index)
    }

    async fn bulk_listing(&self) -> HashSet<String> {
        self.source
            .list_releases()
            .await
            .into_iter()
            .map(|release| release.tag_name)
            .collect()
    }

    /// Derive one index entry from a rulebook directory, or skip it
    async fn build_entry(
        &self,
        dir: &Path,
        releases: &HashSet<String>,
    ) -> Option<IndexEntry> {
        let manifest = match RulebookManifest::from_dir(dir) {
            Ok(manifest) => manifest,
            Err(err) => {
                warn!("Skipping {}: {err}", dir.display());
                return None;
            }
        };

        if manifest.api_version.as_deref() != Some(API_VERSION)
            || manifest.kind.as_deref() != Some(KIND_RULEBOOK)
        {
            warn!("Skipping {}: invalid apiVersion or kind", dir.display());
            return None;
        }

        let (Some(name), Some(version)) = (manifest.name(), manifest.version()) else {
            warn!("Skipping {}: missing name or version", dir.display());
            return None;
        };

        let metadata = manifest.metadata.as_ref()?;
        let mut entry = IndexEntry {
            name: name.to_string(),
            version: version.to_string(),
            description: metadata
                .description
                .as_deref()
                .unwrap_or_default()
                .trim()
                .to_string(),
            harnesses: manifest.harnesses().to_vec(),
            keywords: metadata.keywords.clone(),
            deprecated: manifest.spec.deprecated,
            created: None,
            urls: Vec::new(),
            digest: None,
        };

        let tag = release_tag(&entry.name, &entry.version);
        if releases.contains(&tag) {
            // Detail lookup only for tags known to exist
            let detail = self.source.view_release(&tag).await;
            entry.created = detail
                .as_ref()
                .and_then(|release| release.created_at.clone())
                .or_else(|| Some(Utc::now().to_rfc3339()));

            if let Some(tarball) = detail.as_ref().and_then(|release| release.tarball()) {
                entry.urls = vec![tarball.url.clone()];
                entry.digest = Some(
                    tarball
                        .digest
                        .clone()
                        .unwrap_or_else(|| placeholder_digest(&tag)),
                );
            }
        } else {
            // No release yet: a change pending publication, not an error
            debug!("No release found for tag '{tag}'");
            entry.created = Some(Utc::now().to_rfc3339());
        }

        Some(entry)
    }
}

#[cfg(test)]
mod index_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_version_key_is_numeric() {
        assert!(version_key("1.10.0") > version_key("1.2.0"));
        assert!(version_key("10.0.0") > version_key("9.9.9"));
        assert_eq!(version_key("1.2.3"), vec![1, 2, 3]);
        // Trailing non-digits are ignored per segment
        assert_eq!(version_key("1.0.0-rc1"), vec![1, 0, 0]);
    }

    #[test]
    fn test_release_tag() {
        assert_eq!(release_tag("secure-git", "1.2.0"), "secure-git-1.2.0");
    }

    #[test]
    fn test_placeholder_digest_is_deterministic() {
        let a = placeholder_digest("foo-1.0.0");
        let b = placeholder_digest("foo-1.0.0");
        assert_eq!(a, b);
        assert!(a.starts_with("sha256:"));
        assert_ne!(a, placeholder_digest("foo-1.0.1"));
    }

    #[test]
    fn test_index_yaml_round_trip() {
        let mut index = CatalogIndex::new();
        index.generated = "2026-01-01T00:00:00+00:00".to_string();
        index.entries.insert(
            "secure-git".to_string(),
            vec![IndexEntry {
                name: "secure-git".to_string(),
                version: "1.0.0".to_string(),
                description: "Git security policies".to_string(),
                harnesses: vec!["claude".to_string()],
                keywords: vec!["git".to_string()],
                deprecated: false,
                created: Some("2026-01-01T00:00:00+00:00".to_string()),
                urls: vec!["https://example.com/secure-git-1.0.0.tar.gz".to_string()],
                digest: Some(placeholder_digest("secure-git-1.0.0")),
            }],
        );

        let yaml = index.to_yaml().unwrap();
        assert!(yaml.starts_with("# Cupcake Catalog Index"));

        let parsed = CatalogIndex::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.rulebook_count(), 1);
        assert_eq!(parsed.version_count(), 1);
        assert_eq!(
            parsed.get_latest("secure-git").unwrap().urls,
            index.get_latest("secure-git").unwrap().urls
        );
    }

    #[test]
    fn test_absent_fields_are_omitted_from_yaml() {
        let mut index = CatalogIndex::new();
        index.entries.insert(
            "pending".to_string(),
            vec![IndexEntry {
                name: "pending".to_string(),
                version: "0.1.0".to_string(),
                description: "Not yet released".to_string(),
                harnesses: vec!["claude".to_string()],
                keywords: vec![],
                deprecated: false,
                created: Some("2026-01-01T00:00:00+00:00".to_string()),
                urls: vec![],
                digest: None,
            }],
        );

        let yaml = index.to_yaml().unwrap();
        assert!(!yaml.contains("urls:"));
        assert!(!yaml.contains("digest:"));
    }
}
