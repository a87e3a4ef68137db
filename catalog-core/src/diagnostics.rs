//! Validation diagnostics
//!
//! Rulebook validation is fail-soft: every check appends to an accumulator
//! instead of stopping at the first failure, so a submission gets the
//! complete list of problems in one pass. Only errors affect the exit
//! signal; warnings are advisory.

use std::fmt;
use std::path::{Path, PathBuf};

/// Severity levels for validation issues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Blocks publication of the rulebook
    Error,
    /// Advisory only, never affects pass/fail
    Warning,
}

/// A single validation issue
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Severity of the issue
    pub severity: Severity,
    /// Human-readable description
    pub message: String,
    /// File the issue was found in, relative to the rulebook root
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            location: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            location: None,
        }
    }

    pub fn error_at(location: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            location: Some(location.as_ref().to_path_buf()),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}: {}", location.display(), self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Aggregated validation results for a rulebook
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub issues: Vec<Diagnostic>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: Diagnostic) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = Diagnostic>) {
        self.issues.extend(issues);
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Whether the rulebook passed. Warnings do not fail a report.
    pub fn passed(&self) -> bool {
        self.error_count() == 0
    }
}
