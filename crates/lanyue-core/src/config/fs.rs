//! Virtual filesystem and upload configuration.

use serde::{Deserialize, Serialize};

/// Limits and knobs for the mounted filesystem and the upload controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsConfig {
    /// Largest declared upload size accepted (default 4 GiB).
    #[serde(default = "default_transfer_limit")]
    pub max_upload_size_bytes: u64,
    /// Largest file or directory served by a download (default 4 GiB).
    #[serde(default = "default_transfer_limit")]
    pub max_download_size_bytes: u64,
    /// Fixed chunk size for chunk-mode uploads (default 30 MiB).
    #[serde(default = "default_chunk_size")]
    pub chunk_size_bytes: u64,
    /// Entry names that can never be downloaded.
    #[serde(default)]
    pub skip_files: Vec<String>,
    /// Entries per page for listings and searches.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    /// Scratch directory for directory download archives.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: String,
    /// Minimum interval between cancellation checks inside a write loop.
    /// Zero checks before every slice.
    #[serde(default)]
    pub cancel_poll_interval_ms: u64,
    /// Capacity assigned to new mounts when the request omits one
    /// (default 10 GiB).
    #[serde(default = "default_mount_capacity")]
    pub default_mount_capacity_bytes: u64,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            max_upload_size_bytes: default_transfer_limit(),
            max_download_size_bytes: default_transfer_limit(),
            chunk_size_bytes: default_chunk_size(),
            skip_files: Vec::new(),
            page_size: default_page_size(),
            temp_dir: default_temp_dir(),
            cancel_poll_interval_ms: 0,
            default_mount_capacity_bytes: default_mount_capacity(),
        }
    }
}

fn default_transfer_limit() -> u64 {
    4 * 1024 * 1024 * 1024
}

fn default_chunk_size() -> u64 {
    30 * 1024 * 1024
}

fn default_page_size() -> u64 {
    30
}

fn default_temp_dir() -> String {
    "./data/temp".to_string()
}

fn default_mount_capacity() -> u64 {
    10 * 1024 * 1024 * 1024
}
