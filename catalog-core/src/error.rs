use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading a rulebook manifest.
///
/// These cover structural failures only. Field-level rule violations are
/// reported as [`crate::Diagnostic`]s so that every applicable problem is
/// collected in one pass.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("manifest.yaml not found in {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML in manifest.yaml: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("manifest.yaml is empty")]
    Empty,
}
