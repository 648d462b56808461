//! Thumbnail generation and lookup on the local filesystem.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Local};
use tracing::{debug, warn};
use uuid::Uuid;

use lanyue_core::config::preview::PreviewConfig;
use lanyue_core::error::AppError;
use lanyue_core::result::AppResult;

use super::ThumbnailScheduler;
use crate::providers::mime_from_name;

/// Route prefix under which cached thumbnails are served.
pub const WEB_PREFIX: &str = "/api/fs/thumbnail";

/// Kind of thumbnail a source file produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Image,
    Video,
}

/// Identity of one source file inside the thumbnail cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailKey {
    pub year: i32,
    pub month: u32,
    pub ident: String,
    /// Extension including the leading dot, possibly empty.
    pub ext: String,
    kind: SourceKind,
}

impl ThumbnailKey {
    /// Location relative to the thumbnail root: `{year}/{month}/{id}{ext}`.
    pub fn relative_path(&self) -> String {
        format!("{}/{}/{}{}", self.year, self.month, self.ident, self.ext)
    }

    pub fn web_path(&self) -> String {
        format!("{WEB_PREFIX}/{}", self.relative_path())
    }
}

/// Deterministic thumbnail id of a source file.
pub fn thumbnail_id(name: &str, created: &DateTime<Local>, mime: &str, size: u64) -> String {
    let created = created.format("%Y-%m-%d %H:%M:%S%.6f");
    Uuid::new_v3(
        &Uuid::NAMESPACE_OID,
        format!("{name}_{created}_{mime}_{size}").as_bytes(),
    )
    .to_string()
}

/// Creates and finds thumbnails in the cache directory.
#[derive(Debug, Clone)]
pub struct ThumbnailGenerator {
    root: PathBuf,
    max_edge: u32,
    enabled: bool,
}

impl ThumbnailGenerator {
    pub fn new(config: &PreviewConfig) -> Self {
        Self {
            root: PathBuf::from(&config.thumbnail_dir),
            max_edge: config.max_edge,
            enabled: config.thumbnail,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Cache key of a source file, or `None` for directories, missing files
    /// and media types without thumbnails.
    pub async fn key_for(&self, syspath: &Path) -> Option<ThumbnailKey> {
        let meta = tokio::fs::metadata(syspath).await.ok()?;
        if !meta.is_file() {
            return None;
        }
        let name = syspath.file_name()?.to_string_lossy().to_string();
        let mime = mime_from_name(&name)?;
        let kind = if mime.starts_with("image/") {
            SourceKind::Image
        } else if mime.starts_with("video/") {
            SourceKind::Video
        } else {
            return None;
        };
        // Platforms without a birth time fall back to the modification time.
        let created: DateTime<Local> = meta.created().or_else(|_| meta.modified()).ok()?.into();
        let ext = match kind {
            SourceKind::Image => syspath
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default(),
            SourceKind::Video => ".jpg".to_string(),
        };
        Some(ThumbnailKey {
            year: created.year(),
            month: created.month(),
            ident: thumbnail_id(&name, &created, &mime, meta.len()),
            ext,
            kind,
        })
    }

    /// Web path of the cached thumbnail of `syspath`, if one exists.
    pub async fn lookup(&self, syspath: &Path) -> Option<String> {
        let key = self.key_for(syspath).await?;
        let cached = self.root.join(key.relative_path());
        match tokio::fs::try_exists(&cached).await {
            Ok(true) => Some(key.web_path()),
            _ => None,
        }
    }

    /// Resolve a cached thumbnail requested by its web components.
    pub fn cached_file(&self, year: &str, month: &str, ident: &str) -> AppResult<PathBuf> {
        let valid = |s: &str| {
            !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
                && !s.starts_with('.')
        };
        if !valid(year) || !valid(month) || !valid(ident) {
            return Err(AppError::validation("Invalid thumbnail path"));
        }
        Ok(self.root.join(year).join(month).join(ident))
    }

    /// Generate the thumbnail of `syspath` unless it is cached already.
    /// Returns whether a new thumbnail was written.
    pub async fn generate(&self, syspath: &Path) -> AppResult<bool> {
        if !self.enabled {
            return Ok(false);
        }
        let Some(key) = self.key_for(syspath).await else {
            return Ok(false);
        };
        let size = tokio::fs::metadata(syspath).await?.len();
        if size == 0 {
            return Ok(false);
        }
        let target = self.root.join(key.relative_path());
        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            return Ok(false);
        }
        if key.kind == SourceKind::Video {
            debug!(path = %syspath.display(), "No video decoder available, skipping thumbnail");
            return Ok(false);
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let source = syspath.to_path_buf();
        let max_edge = self.max_edge;
        let written = target.clone();
        tokio::task::spawn_blocking(move || render(&source, &written, max_edge))
            .await
            .map_err(|e| AppError::internal(format!("Thumbnail task failed: {e}")))??;
        debug!(source = %syspath.display(), thumbnail = %target.display(), "Generated thumbnail");
        Ok(true)
    }
}

/// Decode, shrink and re-encode an image in the source's own format.
fn render(source: &Path, target: &Path, max_edge: u32) -> AppResult<()> {
    let data = std::fs::read(source)?;
    let format = image::ImageFormat::from_path(source)
        .map_err(|e| AppError::internal(format!("Unsupported image format: {e}")))?;
    let img = image::load_from_memory_with_format(&data, format)
        .map_err(|e| AppError::internal(format!("Failed to decode image: {e}")))?;

    let thumb = img.thumbnail(max_edge, max_edge);

    let mut buf = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buf);
    thumb
        .write_to(&mut cursor, format)
        .map_err(|e| AppError::internal(format!("Failed to encode thumbnail: {e}")))?;
    std::fs::write(target, buf)?;
    Ok(())
}

impl ThumbnailScheduler for ThumbnailGenerator {
    fn schedule(&self, syspath: PathBuf) {
        if !self.enabled {
            return;
        }
        let generator = self.clone();
        tokio::spawn(async move {
            if let Err(e) = generator.generate(&syspath).await {
                warn!(path = %syspath.display(), error = %e, "Thumbnail generation failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(dir: &Path) -> ThumbnailGenerator {
        ThumbnailGenerator::new(&PreviewConfig {
            thumbnail: true,
            thumbnail_dir: dir.join("thumbs").to_string_lossy().to_string(),
            max_edge: 16,
        })
    }

    fn write_png(path: &Path, width: u32, height: u32) {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 10, 10]));
        img.save(path).unwrap();
    }

    #[test]
    fn test_id_is_deterministic() {
        let created = Local::now();
        let a = thumbnail_id("a.png", &created, "image/png", 10);
        let b = thumbnail_id("a.png", &created, "image/png", 10);
        let c = thumbnail_id("a.png", &created, "image/png", 11);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn test_generate_then_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("photo.png");
        write_png(&source, 64, 32);
        let generator = generator(dir.path());

        assert_eq!(generator.lookup(&source).await, None);
        assert!(generator.generate(&source).await.unwrap());
        assert!(!generator.generate(&source).await.unwrap());

        let web = generator.lookup(&source).await.unwrap();
        assert!(web.starts_with(WEB_PREFIX));
        assert!(web.ends_with(".png"));

        let key = generator.key_for(&source).await.unwrap();
        let cached = generator.root().join(key.relative_path());
        let thumb = image::open(cached).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (16, 8));
    }

    #[tokio::test]
    async fn test_non_media_and_empty_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("notes.txt");
        std::fs::write(&text, b"hello").unwrap();
        let empty = dir.path().join("empty.png");
        std::fs::write(&empty, b"").unwrap();
        let generator = generator(dir.path());

        assert!(generator.key_for(&text).await.is_none());
        assert!(!generator.generate(&text).await.unwrap());
        assert!(!generator.generate(&empty).await.unwrap());
    }

    #[test]
    fn test_cached_file_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(dir.path());
        assert!(generator.cached_file("2024", "5", "abc.png").is_ok());
        assert!(generator.cached_file("..", "5", "abc.png").is_err());
        assert!(generator.cached_file("2024", "5", "a/b").is_err());
    }
}
