//! Thumbnail configuration.

use serde::{Deserialize, Serialize};

/// Thumbnail cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Whether thumbnails are generated after uploads and listings.
    #[serde(default = "default_true")]
    pub thumbnail: bool,
    /// Directory holding the `year/month/<id><ext>` thumbnail tree.
    #[serde(default = "default_thumbnail_dir")]
    pub thumbnail_dir: String,
    /// Longest edge of a generated thumbnail, in pixels.
    #[serde(default = "default_max_edge")]
    pub max_edge: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            thumbnail: true,
            thumbnail_dir: default_thumbnail_dir(),
            max_edge: default_max_edge(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_thumbnail_dir() -> String {
    "./data/thumbnail".to_string()
}

fn default_max_edge() -> u32 {
    800
}
