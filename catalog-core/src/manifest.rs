//! Rulebook manifest parsing (manifest.yaml)
//!
//! The manifest defines metadata for a catalog rulebook including name,
//! version, description, supported harnesses, and more.
//!
//! Loading and field validation are separate steps: [`RulebookManifest`]
//! deserializes with every schema field optional, so a structurally valid
//! document always loads and `validate` can report the complete set of
//! field-level problems instead of failing on the first absent key.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::diagnostics::Diagnostic;
use crate::error::ManifestError;

/// Required apiVersion for all catalog documents
pub const API_VERSION: &str = "cupcake.dev/v1";

/// Required kind for rulebook manifests
pub const KIND_RULEBOOK: &str = "Rulebook";

/// Valid harness types for rulebooks
pub const VALID_HARNESSES: &[&str] = &["claude", "cursor", "opencode", "factory"];

/// Rulebook names: lowercase alphanumeric with hyphens
static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9-]*$").expect("valid name pattern"));

/// Versions: leading major.minor.patch
static VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\d+\.\d+").expect("valid version pattern"));

/// A rulebook manifest (manifest.yaml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RulebookManifest {
    /// API version (must be "cupcake.dev/v1")
    pub api_version: Option<String>,

    /// Kind (must be "Rulebook")
    pub kind: Option<String>,

    /// Rulebook metadata
    pub metadata: Option<ManifestMetadata>,

    /// Optional spec fields
    pub spec: ManifestSpec,
}

/// Rulebook metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManifestMetadata {
    /// Unique rulebook name (lowercase alphanumeric with hyphens)
    pub name: Option<String>,

    /// Semantic version (e.g., "1.2.3")
    pub version: Option<String>,

    /// Description of the rulebook
    pub description: Option<String>,

    /// Supported harnesses
    pub harnesses: Option<Vec<String>>,

    /// Searchable keywords
    pub keywords: Vec<String>,

    /// SPDX license identifier
    pub license: Option<String>,

    /// Maintainer information
    pub maintainers: Vec<Maintainer>,

    /// Homepage URL
    pub homepage: Option<String>,

    /// Source repository URL
    pub repository: Option<String>,
}

/// Maintainer information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Maintainer {
    /// Maintainer name
    pub name: Option<String>,

    /// Email address
    pub email: Option<String>,

    /// Website URL
    pub url: Option<String>,
}

/// Optional specification fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManifestSpec {
    /// Minimum Cupcake version required (semver range)
    pub cupcake_version: Option<String>,

    /// Whether this rulebook is deprecated
    pub deprecated: bool,

    /// Deprecation warning message
    pub deprecation_warning: Option<String>,
}

impl RulebookManifest {
    /// Load manifest from a rulebook directory
    pub fn from_dir(dir: &Path) -> Result<Self, ManifestError> {
        let path = dir.join("manifest.yaml");
        if !path.exists() {
            return Err(ManifestError::NotFound(dir.to_path_buf()));
        }
        Self::from_file(&path)
    }

    /// Load manifest from a file path
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse manifest from YAML string
    pub fn from_yaml(content: &str) -> Result<Self, ManifestError> {
        if content.trim().is_empty() {
            return Err(ManifestError::Empty);
        }
        Ok(serde_yaml_ng::from_str(content)?)
    }

    /// Validate manifest contents against the catalog schema.
    ///
    /// `dir_name` is the name of the directory containing the manifest;
    /// `metadata.name` must match it. Every applicable violation is
    /// collected, except that without a `metadata` object no field-level
    /// checks can run.
    pub fn validate(&self, dir_name: &str) -> Vec<Diagnostic> {
        let mut errors = Vec::new();

        if self.api_version.as_deref() != Some(API_VERSION) {
            errors.push(Diagnostic::error(format!(
                "apiVersion must be '{}', got '{}'",
                API_VERSION,
                self.api_version.as_deref().unwrap_or("(missing)")
            )));
        }

        if self.kind.as_deref() != Some(KIND_RULEBOOK) {
            errors.push(Diagnostic::error(format!(
                "kind must be '{}', got '{}'",
                KIND_RULEBOOK,
                self.kind.as_deref().unwrap_or("(missing)")
            )));
        }

        let Some(metadata) = &self.metadata else {
            errors.push(Diagnostic::error("metadata is required and must be an object"));
            return errors; // Can't continue without metadata
        };

        match metadata.name.as_deref() {
            None | Some("") => errors.push(Diagnostic::error("metadata.name is required")),
            Some(name) if !NAME_PATTERN.is_match(name) => errors.push(Diagnostic::error(format!(
                "metadata.name must be lowercase alphanumeric with hyphens, got '{name}'"
            ))),
            Some(name) if name != dir_name => errors.push(Diagnostic::error(format!(
                "metadata.name '{name}' must match directory name '{dir_name}'"
            ))),
            Some(_) => {}
        }

        match metadata.version.as_deref() {
            None | Some("") => errors.push(Diagnostic::error("metadata.version is required")),
            Some(version) if !VERSION_PATTERN.is_match(version) => {
                errors.push(Diagnostic::error(format!(
                    "metadata.version must be semver (e.g., 1.0.0), got '{version}'"
                )))
            }
            Some(_) => {}
        }

        match metadata.description.as_deref() {
            None | Some("") => errors.push(Diagnostic::error("metadata.description is required")),
            Some(description) if description.trim().chars().count() < 10 => errors.push(
                Diagnostic::error("metadata.description must be at least 10 characters"),
            ),
            Some(_) => {}
        }

        match &metadata.harnesses {
            None => errors.push(Diagnostic::error("metadata.harnesses is required")),
            Some(harnesses) if harnesses.is_empty() => errors.push(Diagnostic::error(
                "metadata.harnesses must contain at least one harness",
            )),
            Some(harnesses) => {
                for harness in harnesses {
                    if !VALID_HARNESSES.contains(&harness.as_str()) {
                        errors.push(Diagnostic::error(format!(
                            "Invalid harness '{harness}'. Valid: {VALID_HARNESSES:?}"
                        )));
                    }
                }
            }
        }

        for (i, maintainer) in metadata.maintainers.iter().enumerate() {
            if maintainer.name.as_deref().unwrap_or("").is_empty() {
                errors.push(Diagnostic::error(format!(
                    "metadata.maintainers[{i}].name is required"
                )));
            }
        }

        errors
    }

    /// `metadata.name`, when present and non-empty
    pub fn name(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.name.as_deref())
            .filter(|n| !n.is_empty())
    }

    /// `metadata.version`, when present and non-empty
    pub fn version(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.version.as_deref())
            .filter(|v| !v.is_empty())
    }

    /// Declared harnesses, empty when absent
    pub fn harnesses(&self) -> &[String] {
        self.metadata
            .as_ref()
            .and_then(|m| m.harnesses.as_deref())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod manifest_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn valid_yaml() -> &'static str {
        r#"
apiVersion: cupcake.dev/v1
kind: Rulebook
metadata:
  name: test-rulebook
  version: 1.0.0
  description: A test rulebook for validation
  harnesses:
    - claude
    - cursor
  keywords:
    - testing
  maintainers:
    - name: EQTY Lab
      email: support@eqtylab.io
spec:
  deprecated: false
"#
    }

    #[test]
    fn test_valid_manifest_has_no_errors() {
        let manifest = RulebookManifest::from_yaml(valid_yaml()).unwrap();
        assert_eq!(manifest.name(), Some("test-rulebook"));
        assert_eq!(manifest.version(), Some("1.0.0"));
        assert!(manifest.validate("test-rulebook").is_empty());
    }

    #[test]
    fn test_empty_manifest_is_parse_error() {
        assert!(matches!(
            RulebookManifest::from_yaml("   \n"),
            Err(ManifestError::Empty)
        ));
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        assert!(matches!(
            RulebookManifest::from_yaml("kind: [unclosed"),
            Err(ManifestError::Yaml(_))
        ));
    }

    #[test]
    fn test_wrong_api_version_and_kind() {
        let yaml = r#"
apiVersion: cupcake.dev/v2
kind: Cookbook
metadata:
  name: test
  version: 1.0.0
  description: Test description here
  harnesses: [claude]
"#;
        let manifest = RulebookManifest::from_yaml(yaml).unwrap();
        let errors = manifest.validate("test");
        assert_eq!(errors.len(), 2);
        assert!(errors[0].message.contains("apiVersion"));
        assert!(errors[1].message.contains("kind"));
    }

    #[test]
    fn test_missing_metadata_stops_field_checks() {
        let yaml = "apiVersion: cupcake.dev/v1\nkind: Rulebook\n";
        let manifest = RulebookManifest::from_yaml(yaml).unwrap();
        let errors = manifest.validate("test");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("metadata is required"));
    }

    #[test]
    fn test_name_must_match_directory() {
        let manifest = RulebookManifest::from_yaml(valid_yaml()).unwrap();
        let errors = manifest.validate("other-dir");
        assert_eq!(errors.len(), 1);
        assert!(errors[0]
            .message
            .contains("must match directory name 'other-dir'"));
    }

    #[test]
    fn test_name_format() {
        let yaml = r#"
apiVersion: cupcake.dev/v1
kind: Rulebook
metadata:
  name: Bad_Name
  version: 1.0.0
  description: Test description here
  harnesses: [claude]
"#;
        let manifest = RulebookManifest::from_yaml(yaml).unwrap();
        let errors = manifest.validate("Bad_Name");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("lowercase alphanumeric"));
    }

    #[test]
    fn test_version_pattern() {
        for (version, ok) in [("1.0", false), ("1.0.0", true), ("10.20.30", true)] {
            let yaml = format!(
                r#"
apiVersion: cupcake.dev/v1
kind: Rulebook
metadata:
  name: test
  version: "{version}"
  description: Test description here
  harnesses: [claude]
"#
            );
            let manifest = RulebookManifest::from_yaml(&yaml).unwrap();
            let errors = manifest.validate("test");
            if ok {
                assert!(errors.is_empty(), "{version} should pass: {errors:?}");
            } else {
                assert_eq!(errors.len(), 1, "{version} should fail once");
                assert!(errors[0].message.contains("semver"));
            }
        }
    }

    #[test]
    fn test_short_description() {
        let yaml = r#"
apiVersion: cupcake.dev/v1
kind: Rulebook
metadata:
  name: test
  version: 1.0.0
  description: "short   "
  harnesses: [claude]
"#;
        let manifest = RulebookManifest::from_yaml(yaml).unwrap();
        let errors = manifest.validate("test");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("at least 10 characters"));
    }

    #[test]
    fn test_description_length_counts_characters_not_bytes() {
        // Nine two-byte characters: 18 bytes but still too short
        let yaml = r#"
apiVersion: cupcake.dev/v1
kind: Rulebook
metadata:
  name: test
  version: 1.0.0
  description: "üüüüüüüüü"
  harnesses: [claude]
"#;
        let manifest = RulebookManifest::from_yaml(yaml).unwrap();
        let errors = manifest.validate("test");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("at least 10 characters"));

        // Ten multibyte characters pass
        let yaml = yaml.replace("üüüüüüüüü", "üüüüüüüüüü");
        let manifest = RulebookManifest::from_yaml(&yaml).unwrap();
        assert!(manifest.validate("test").is_empty());
    }

    #[test]
    fn test_invalid_harness() {
        let yaml = r#"
apiVersion: cupcake.dev/v1
kind: Rulebook
metadata:
  name: test
  version: 1.0.0
  description: Test description here
  harnesses: [claude, copilot]
"#;
        let manifest = RulebookManifest::from_yaml(yaml).unwrap();
        let errors = manifest.validate("test");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("Invalid harness 'copilot'"));
    }

    #[test]
    fn test_empty_harnesses() {
        let yaml = r#"
apiVersion: cupcake.dev/v1
kind: Rulebook
metadata:
  name: test
  version: 1.0.0
  description: Test description here
  harnesses: []
"#;
        let manifest = RulebookManifest::from_yaml(yaml).unwrap();
        let errors = manifest.validate("test");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("at least one harness"));
    }

    #[test]
    fn test_maintainer_without_name() {
        let yaml = r#"
apiVersion: cupcake.dev/v1
kind: Rulebook
metadata:
  name: test
  version: 1.0.0
  description: Test description here
  harnesses: [claude]
  maintainers:
    - email: anonymous@example.com
"#;
        let manifest = RulebookManifest::from_yaml(yaml).unwrap();
        let errors = manifest.validate("test");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("maintainers[0].name"));
    }

    #[test]
    fn test_all_errors_collected_in_one_pass() {
        let yaml = r#"
apiVersion: wrong/v1
kind: Rulebook
metadata:
  name: test
  version: "1.0"
  description: Test description here
  harnesses: [claude]
"#;
        let manifest = RulebookManifest::from_yaml(yaml).unwrap();
        let errors = manifest.validate("elsewhere");
        // apiVersion, name/directory mismatch, version pattern
        assert_eq!(errors.len(), 3);
    }
}
