//! File manager operations and downloads over the virtual filesystem.

pub mod download;
pub mod service;

pub use download::{ByteRange, DownloadService, DownloadSource};
pub use service::{FileEntry, FileService};
