//! Thumbnail cache for image and video files.
//!
//! Thumbnails live under `{thumbnail_dir}/{year}/{month}/{id}{ext}`, where
//! the id is derived from the source file's name, creation time, media type
//! and size. Identical sources therefore map to the same cache entry.

pub mod generator;

use std::path::PathBuf;

pub use generator::ThumbnailGenerator;

/// Fire-and-forget thumbnail scheduling. Callers never wait on the result.
pub trait ThumbnailScheduler: Send + Sync + std::fmt::Debug {
    /// Queue generation for the file at `syspath`.
    fn schedule(&self, syspath: PathBuf);
}
