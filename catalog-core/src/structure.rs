//! Rulebook structure validation
//!
//! Checks the filesystem artifacts a rulebook must ship: README, one policy
//! directory per declared harness, and the shared `system/evaluate.rego`
//! entrypoint at the rulebook root.

use std::path::Path;
use tracing::debug;

use crate::diagnostics::{Diagnostic, ValidationReport};
use crate::manifest::RulebookManifest;

/// Shared evaluation entrypoint, relative to the rulebook root. One per
/// rulebook, not per harness.
pub const ENTRYPOINT_PATH: &str = "system/evaluate.rego";

/// Validate rulebook directory structure. Returns all problems found.
pub fn validate_structure(rulebook_path: &Path, harnesses: &[String]) -> Vec<Diagnostic> {
    let mut errors = Vec::new();

    if !rulebook_path.join("README.md").exists() {
        errors.push(Diagnostic::error("README.md is required"));
    }

    let policies_dir = rulebook_path.join("policies");
    if !policies_dir.exists() {
        errors.push(Diagnostic::error("policies/ directory is required"));
        return errors; // Can't continue without policies
    }

    // Shared across all harnesses, so it lives at the root
    if !rulebook_path.join(ENTRYPOINT_PATH).exists() {
        errors.push(Diagnostic::error(format!(
            "Missing {ENTRYPOINT_PATH} at rulebook root"
        )));
    }

    for harness in harnesses {
        let harness_dir = policies_dir.join(harness);
        if !harness_dir.is_dir() {
            errors.push(Diagnostic::error(format!(
                "Missing policies/{harness}/ directory for declared harness"
            )));
            continue;
        }

        if !has_rego_file(&harness_dir) {
            errors.push(Diagnostic::error(format!(
                "No .rego policy files in policies/{harness}/"
            )));
        }
    }

    errors
}

/// Whether a directory directly contains at least one `.rego` file
fn has_rego_file(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries.flatten().any(|e| {
                e.path().is_file() && e.path().extension().is_some_and(|ext| ext == "rego")
            })
        })
        .unwrap_or(false)
}

/// Validate a rulebook: manifest schema plus directory structure.
///
/// A manifest that fails to load produces a single top-level error; field
/// and structure checks otherwise all run and their findings are collected.
/// Structure checks need the declared harness list, so they are skipped when
/// `metadata.harnesses` is absent.
pub fn validate_rulebook(rulebook_path: &Path) -> ValidationReport {
    let mut report = ValidationReport::new();

    let manifest = match RulebookManifest::from_dir(rulebook_path) {
        Ok(manifest) => manifest,
        Err(err) => {
            // Parse failures escalate to a single top-level error; there is
            // nothing meaningful to validate field-by-field.
            report.push(Diagnostic::error(err.to_string()));
            return report;
        }
    };

    let dir_name = rulebook_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    report.extend(manifest.validate(&dir_name));

    let harnesses = manifest.harnesses();
    if !harnesses.is_empty() {
        report.extend(validate_structure(rulebook_path, harnesses));
    } else {
        debug!("Skipping structure checks: no harnesses declared");
    }

    if !rulebook_path.join("CHANGELOG.md").exists() {
        report.push(Diagnostic::warning(
            "CHANGELOG.md is recommended for tracking version history",
        ));
    }

    report
}
