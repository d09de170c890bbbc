//! Pipeline configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Policy governing how content-addressed collapsing is scoped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DedupeMode {
    /// Identical bytes anywhere in the site collapse to one public file.
    #[default]
    Global,
    /// Collapsing happens only within a single document.
    PerPost,
}

/// Configuration consumed from the surrounding build system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaConfig {
    /// First public path segment for localized assets.
    pub public_base: String,
    /// Dedupe scoping policy.
    pub dedupe_mode: DedupeMode,
    /// Where the usage ledger is persisted.
    pub usage_log_path: PathBuf,
    /// Default attribute string for expanded `<video>` tags.
    pub video_attrs: String,
    /// Filesystem root the public tree is written under.
    pub output_root: PathBuf,
    /// Path segment marking the content root for post-id derivation.
    pub content_root_marker: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            public_base: "assets".to_string(),
            dedupe_mode: DedupeMode::Global,
            usage_log_path: PathBuf::from(".asset-usage.json"),
            video_attrs: "controls playsinline muted".to_string(),
            output_root: PathBuf::from("public"),
            content_root_marker: "src/content".to_string(),
        }
    }
}
