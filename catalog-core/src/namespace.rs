//! Rego namespace validation
//!
//! Catalog policies are namespaced under the rulebook that ships them so
//! that installed rulebooks never collide with each other or with the host
//! platform's own packages:
//!
//! - `policies/<harness>/*.rego` → `catalog.<name>.policies.*`
//! - `helpers/*.rego`            → `catalog.<name>.helpers.*`
//! - `system/*.rego`             → exactly `catalog.<name>.system`
//!
//! where `<name>` is the rulebook name with hyphens converted to
//! underscores. The `cupcake.*` namespaces are reserved for the platform.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use walkdir::WalkDir;

use crate::diagnostics::Diagnostic;
use crate::manifest::RulebookManifest;

/// Reserved namespace prefixes that catalog policies must NOT use
pub const RESERVED_PREFIXES: &[&str] = &[
    "cupcake.policies",
    "cupcake.global",
    "cupcake.system",
    "cupcake.helpers",
];

/// Matches a package declaration at the start of a line
static PACKAGE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*package\s+([\w.]+)").expect("valid package pattern"));

/// Result of scanning a policy file for its package declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageDeclaration {
    Found(String),
    NotFound,
}

/// Extract the first package declaration from Rego source.
///
/// This is a pure string-level scan, not a Rego parser; the policy text is
/// otherwise opaque to the catalog tooling.
pub fn package_declaration(content: &str) -> PackageDeclaration {
    match PACKAGE_PATTERN
        .captures(content)
        .and_then(|captures| captures.get(1))
    {
        Some(name) => PackageDeclaration::Found(name.as_str().to_string()),
        None => PackageDeclaration::NotFound,
    }
}

/// Convert a rulebook name to Rego-compatible format (hyphens to underscores)
pub fn normalize_name(name: &str) -> String {
    name.replace('-', "_")
}

/// The three policy file categories, each with its own namespace rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileCategory {
    /// `policies/<harness>/` - prefix match, system variant also accepted
    Policy,
    /// `helpers/` - prefix match
    Helper,
    /// `system/` - exact match
    System,
}

/// Expected namespaces for one rulebook
#[derive(Debug, Clone)]
pub struct NamespaceRules {
    policy_prefix: String,
    helper_prefix: String,
    system_package: String,
}

impl NamespaceRules {
    pub fn for_rulebook(name: &str) -> Self {
        let normalized = normalize_name(name);
        Self {
            policy_prefix: format!("catalog.{normalized}.policies"),
            helper_prefix: format!("catalog.{normalized}.helpers"),
            system_package: format!("catalog.{normalized}.system"),
        }
    }

    /// Check one file's declared package against its category rule.
    fn check_file(&self, path: &Path, rel: &Path, category: FileCategory) -> Vec<Diagnostic> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                return vec![Diagnostic::error_at(rel, format!("Cannot read file: {err}"))];
            }
        };

        let package = match package_declaration(&content) {
            PackageDeclaration::Found(package) => package,
            PackageDeclaration::NotFound => {
                return vec![Diagnostic::error_at(rel, "No package declaration found")];
            }
        };

        // Reserved namespaces are checked first and short-circuit the
        // prefix rule, so one bad package yields one violation.
        for reserved in RESERVED_PREFIXES {
            if package.starts_with(reserved) {
                return vec![Diagnostic::error_at(
                    rel,
                    format!(
                        "Package '{package}' uses reserved namespace '{reserved}'. \
                         Use '{}.*' instead.",
                        self.policy_prefix
                    ),
                )];
            }
        }

        match category {
            FileCategory::Policy => {
                // System-level packages may sit alongside policies in the
                // policies/ tree.
                if !package.starts_with(&self.policy_prefix)
                    && !package.starts_with(&self.system_package)
                {
                    return vec![Diagnostic::error_at(
                        rel,
                        format!(
                            "Package '{package}' must start with '{}' or '{}'",
                            self.policy_prefix, self.system_package
                        ),
                    )];
                }
            }
            FileCategory::Helper => {
                if !package.starts_with(&self.helper_prefix) {
                    return vec![Diagnostic::error_at(
                        rel,
                        format!(
                            "Package '{package}' must start with '{}'",
                            self.helper_prefix
                        ),
                    )];
                }
            }
            FileCategory::System => {
                if package != self.system_package {
                    return vec![Diagnostic::error_at(
                        rel,
                        format!(
                            "Package '{package}' must be exactly '{}'",
                            self.system_package
                        ),
                    )];
                }
            }
        }

        Vec::new()
    }
}

/// Validate all policy files in a rulebook. Returns all violations found.
pub fn validate_namespaces(rulebook_path: &Path) -> Vec<Diagnostic> {
    let Some(name) = rulebook_name(rulebook_path) else {
        return vec![Diagnostic::error(
            "Cannot determine rulebook name from manifest.yaml",
        )];
    };

    let rules = NamespaceRules::for_rulebook(&name);
    let mut errors = Vec::new();

    let policies_dir = rulebook_path.join("policies");
    if !policies_dir.exists() {
        return vec![Diagnostic::error("No policies/ directory found")];
    }

    let policy_files = rego_files(&policies_dir);
    if policy_files.is_empty() {
        return vec![Diagnostic::error("No .rego files found in policies/")];
    }

    for path in policy_files {
        errors.extend(check_relative(&rules, rulebook_path, &path, FileCategory::Policy));
    }

    // helpers/ and system/ are optional trees
    let helpers_dir = rulebook_path.join("helpers");
    if helpers_dir.exists() {
        for path in rego_files(&helpers_dir) {
            errors.extend(check_relative(&rules, rulebook_path, &path, FileCategory::Helper));
        }
    }

    let system_dir = rulebook_path.join("system");
    if system_dir.exists() {
        for path in rego_files(&system_dir) {
            errors.extend(check_relative(&rules, rulebook_path, &path, FileCategory::System));
        }
    }

    errors
}

fn check_relative(
    rules: &NamespaceRules,
    root: &Path,
    path: &Path,
    category: FileCategory,
) -> Vec<Diagnostic> {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rules.check_file(path, rel, category)
}

/// All `.rego` files under a directory, sorted for stable output
fn rego_files(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut files: Vec<_> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "rego")
        })
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

fn rulebook_name(rulebook_path: &Path) -> Option<String> {
    RulebookManifest::from_dir(rulebook_path)
        .ok()
        .and_then(|manifest| manifest.name().map(String::from))
}
