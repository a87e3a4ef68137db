//! Cupcake Catalog core - rulebook validation and index generation
//!
//! This library backs the catalog repository tooling: it validates rulebook
//! submissions and regenerates the published `index.yaml`.
//!
//! # Overview
//!
//! A rulebook is a versioned bundle of Rego policies described by a
//! `manifest.yaml`. The tooling covers three concerns that share one data
//! model:
//! - Manifest schema validation ([`manifest`])
//! - Structure and namespace validation ([`structure`], [`namespace`])
//! - Catalog index generation from manifests plus release metadata
//!   ([`index`], [`release`])
//!
//! # Architecture
//!
//! ```text
//! rulebooks/<name>/manifest.yaml ──► manifest ──► structure
//!                                       │
//! rulebooks/<name>/**/*.rego  ──────► namespace
//!                                       │
//! gh release list / view  ──► release ──► index ──► index.yaml
//! ```

pub mod diagnostics;
pub mod error;
pub mod index;
pub mod manifest;
pub mod namespace;
pub mod release;
pub mod structure;

pub use diagnostics::{Diagnostic, Severity, ValidationReport};
pub use error::ManifestError;
pub use index::{CatalogIndex, IndexBuilder, IndexEntry};
pub use manifest::{Maintainer, ManifestMetadata, ManifestSpec, RulebookManifest};
pub use release::{GhReleaseSource, Release, ReleaseAsset, ReleaseSource};
