use std::path::PathBuf;

use serde::Deserialize;

use crate::preview::DEFAULT_PREVIEW_WIDTH;

/// Avatar storage and preview configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AvatarConfig {
    /// Directory holding one original file per owner. Default: "./avatars".
    #[serde(default = "default_avatar_dir")]
    pub dir: PathBuf,
    /// Largest accepted upload in bytes. Default: 300 KiB.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: u64,
    /// Width of generated previews in pixels. Default: 100.
    #[serde(default = "default_preview_width")]
    pub preview_width: u32,
}

fn default_avatar_dir() -> PathBuf {
    PathBuf::from("./avatars")
}
fn default_max_upload_size() -> u64 {
    300 * 1024
}
fn default_preview_width() -> u32 {
    DEFAULT_PREVIEW_WIDTH
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            dir: default_avatar_dir(),
            max_upload_size: default_max_upload_size(),
            preview_width: default_preview_width(),
        }
    }
}
