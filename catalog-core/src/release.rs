//! Release metadata resolution
//!
//! The catalog repository publishes each rulebook version as a GitHub
//! release tagged `<name>-<version>`. Index generation correlates local
//! manifests with those releases through the `gh` CLI.
//!
//! Lookups fail soft: if `gh` is missing, unauthenticated, or returns
//! garbage, the resolver degrades to empty results so the index build can
//! proceed with best-effort data. Registry failures are never validation
//! errors.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

/// Page size for the bulk release listing
pub const RELEASE_LIST_LIMIT: u32 = 100;

/// A release asset (tarball) attached to a release
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseAsset {
    pub name: String,
    #[serde(default)]
    pub url: String,
    /// Content digest as reported by the registry, when available
    #[serde(default)]
    pub digest: Option<String>,
}

/// Release metadata for one tag
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

impl Release {
    /// The first `.tar.gz` asset, if the release carries one
    pub fn tarball(&self) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|a| a.name.ends_with(".tar.gz"))
    }
}

/// Capability interface over the release registry.
///
/// Two query shapes: a bulk listing used to determine which tags exist, and
/// a per-tag detail lookup used only for tags known to exist. Both degrade
/// to empty results on failure.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// List known release tags (up to the most recent [`RELEASE_LIST_LIMIT`])
    async fn list_releases(&self) -> Vec<Release>;

    /// Fetch detailed metadata for a single tag
    async fn view_release(&self, tag: &str) -> Option<Release>;
}

/// [`ReleaseSource`] backed by the `gh` CLI
#[derive(Debug, Default)]
pub struct GhReleaseSource;

impl GhReleaseSource {
    pub fn new() -> Self {
        Self
    }

    async fn run_gh(&self, args: &[&str]) -> Option<String> {
        let output = match tokio::process::Command::new("gh").args(args).output().await {
            Ok(output) => output,
            Err(err) => {
                // gh CLI not installed
                debug!("gh is not available: {err}");
                return None;
            }
        };

        if !output.status.success() {
            // Typically not authenticated or no releases yet
            debug!(
                "gh {} failed: {}",
                args.first().unwrap_or(&""),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return None;
        }

        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl ReleaseSource for GhReleaseSource {
    async fn list_releases(&self) -> Vec<Release> {
        let limit = RELEASE_LIST_LIMIT.to_string();
        let Some(stdout) = self
            .run_gh(&[
                "release",
                "list",
                "--json",
                "tagName,createdAt,assets",
                "--limit",
                &limit,
            ])
            .await
        else {
            return Vec::new();
        };

        match serde_json::from_str::<Vec<Release>>(&stdout) {
            Ok(releases) => {
                debug!("Listed {} release(s)", releases.len());
                releases
            }
            Err(err) => {
                warn!("Failed to parse gh release list output: {err}");
                Vec::new()
            }
        }
    }

    async fn view_release(&self, tag: &str) -> Option<Release> {
        let stdout = self
            .run_gh(&["release", "view", tag, "--json", "tagName,createdAt,assets"])
            .await?;

        match serde_json::from_str::<Release>(&stdout) {
            Ok(release) => Some(release),
            Err(err) => {
                warn!("Failed to parse gh release view output for '{tag}': {err}");
                None
            }
        }
    }
}
