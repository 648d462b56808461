//! Download preparation: access checks, directory archives and byte ranges.

use std::path::PathBuf;

use tracing::info;

use lanyue_core::config::fs::FsConfig;
use lanyue_core::error::AppError;
use lanyue_core::result::AppResult;
use lanyue_core::types::VirtualPath;
use lanyue_storage::Vfs;
use lanyue_storage::archive::zip_directory;

use crate::context::RequestContext;

/// A file ready to be streamed to the client.
#[derive(Debug, Clone)]
pub struct DownloadSource {
    /// Physical file to read.
    pub path: PathBuf,
    /// Name offered in `Content-Disposition`.
    pub file_name: String,
    pub mime: String,
    pub len: u64,
    /// Whether `path` is a temporary archive to delete after streaming.
    pub delete_after: bool,
}

/// An inclusive byte span of a file of `total` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

impl ByteRange {
    /// Parse a single-range `Range` header value against a file length.
    ///
    /// Accepts `bytes=a-b`, `bytes=a-` and the suffix form `bytes=-n`. An
    /// end past the file is clamped to the last byte.
    pub fn parse(header: &str, total: u64) -> AppResult<Self> {
        let invalid = || {
            AppError::range_not_satisfiable(format!("Invalid range '{header}' for {total} bytes"))
        };
        let ranges = header.trim().strip_prefix("bytes=").ok_or_else(invalid)?;
        if ranges.contains(',') || total == 0 {
            return Err(invalid());
        }
        let (start, end) = ranges.split_once('-').ok_or_else(invalid)?;
        let (start, end) = (start.trim(), end.trim());

        if start.is_empty() {
            let suffix: u64 = end.parse().map_err(|_| invalid())?;
            if suffix == 0 {
                return Err(invalid());
            }
            return Ok(Self {
                start: total.saturating_sub(suffix),
                end: total - 1,
                total,
            });
        }

        let start: u64 = start.parse().map_err(|_| invalid())?;
        let end = if end.is_empty() {
            total - 1
        } else {
            end.parse::<u64>().map_err(|_| invalid())?.min(total - 1)
        };
        if start >= total || start > end {
            return Err(invalid());
        }
        Ok(Self { start, end, total })
    }

    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// Value of the `Content-Range` response header.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total)
    }
}

/// Turns virtual paths into streamable sources.
#[derive(Clone)]
pub struct DownloadService {
    vfs: Vfs,
    config: FsConfig,
}

impl std::fmt::Debug for DownloadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadService").finish()
    }
}

impl DownloadService {
    pub fn new(vfs: Vfs, config: FsConfig) -> Self {
        Self { vfs, config }
    }

    /// Check that `path` may be downloaded and resolve what to stream.
    /// Directories are packed into a temporary zip archive first.
    pub async fn prepare(
        &self,
        ctx: &RequestContext,
        path: &VirtualPath,
    ) -> AppResult<DownloadSource> {
        ctx.require_admin()?;
        let name = path
            .file_name()
            .ok_or_else(|| AppError::validation("The root directory cannot be downloaded"))?
            .to_string();
        if self.config.skip_files.iter().any(|skip| *skip == name) {
            return Err(AppError::authorization(format!("'{name}' cannot be downloaded")));
        }

        let entry = self.vfs.detail(path).await?;
        if entry.size > self.config.max_download_size_bytes {
            return Err(AppError::capacity_exceeded(format!(
                "'{name}' holds {} bytes, more than the download limit of {}",
                entry.size, self.config.max_download_size_bytes
            )));
        }

        if entry.is_dir {
            let temp_dir = PathBuf::from(&self.config.temp_dir);
            let archive = zip_directory(&self.vfs, path, &temp_dir).await?;
            let len = tokio::fs::metadata(&archive).await?.len();
            info!(path = %path, archive = %archive.display(), len, "Prepared directory download");
            return Ok(DownloadSource {
                path: archive,
                file_name: format!("{name}.zip"),
                mime: "application/zip".to_string(),
                len,
                delete_after: true,
            });
        }

        Ok(DownloadSource {
            path: self.vfs.physical_path(path).await?,
            file_name: name,
            mime: entry
                .mime_type
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            len: entry.size,
            delete_after: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lanyue_core::ErrorKind;
    use lanyue_entity::storage::OrderField;
    use lanyue_storage::{LocalBackend, MountPoint, MountTable};

    use super::*;

    #[test]
    fn test_parse_ranges() {
        assert_eq!(
            ByteRange::parse("bytes=0-99", 1000).unwrap(),
            ByteRange { start: 0, end: 99, total: 1000 }
        );
        assert_eq!(ByteRange::parse("bytes=900-", 1000).unwrap().len(), 100);
        let suffix = ByteRange::parse("bytes=-10", 1000).unwrap();
        assert_eq!((suffix.start, suffix.end), (990, 999));
        assert_eq!(ByteRange::parse("bytes=990-5000", 1000).unwrap().end, 999);
        assert_eq!(
            ByteRange::parse("bytes=-5000", 1000).unwrap().content_range(),
            "bytes 0-999/1000"
        );
    }

    #[test]
    fn test_unsatisfiable_ranges() {
        for header in [
            "bytes=1000-",
            "bytes=5-2",
            "items=0-1",
            "bytes=0-1,4-5",
            "bytes=-0",
            "bytes=x-",
        ] {
            let err = ByteRange::parse(header, 1000).unwrap_err();
            assert_eq!(err.kind, ErrorKind::RangeNotSatisfiable, "{header}");
        }
        assert!(ByteRange::parse("bytes=0-", 0).is_err());
    }

    async fn service(
        data: &std::path::Path,
        temp: &std::path::Path,
        limit: u64,
    ) -> DownloadService {
        let table = MountTable::new();
        table
            .mount(MountPoint {
                name: "docs".into(),
                backend: Arc::new(LocalBackend::new(data).await.unwrap()),
                capacity: 1 << 20,
                order_field: OrderField::Name,
                reverse: false,
            })
            .await
            .unwrap();
        DownloadService::new(
            Vfs::new(table),
            FsConfig {
                max_download_size_bytes: limit,
                skip_files: vec!["secret.key".to_string()],
                temp_dir: temp.to_string_lossy().to_string(),
                ..FsConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_prepare_file_and_directory() {
        let data = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        std::fs::create_dir(data.path().join("album")).unwrap();
        std::fs::write(data.path().join("album/notes.txt"), b"hello").unwrap();
        let svc = service(data.path(), temp.path(), 1024).await;
        let ctx = RequestContext::system();

        let file = svc
            .prepare(&ctx, &VirtualPath::parse("/docs/album/notes.txt").unwrap())
            .await
            .unwrap();
        assert_eq!(file.len, 5);
        assert_eq!(file.mime, "text/plain");
        assert!(!file.delete_after);

        let dir = svc
            .prepare(&ctx, &VirtualPath::parse("/docs/album").unwrap())
            .await
            .unwrap();
        assert_eq!(dir.file_name, "album.zip");
        assert!(dir.delete_after);
        assert!(dir.path.starts_with(temp.path()));
        assert!(dir.len > 0);
    }

    #[tokio::test]
    async fn test_prepare_rejects_protected_and_oversized() {
        let data = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(data.path().join("secret.key"), b"k").unwrap();
        std::fs::write(data.path().join("big.bin"), vec![0u8; 64]).unwrap();
        let svc = service(data.path(), temp.path(), 32).await;
        let ctx = RequestContext::system();

        let err = svc
            .prepare(&ctx, &VirtualPath::parse("/docs/secret.key").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);

        let err = svc
            .prepare(&ctx, &VirtualPath::parse("/docs/big.bin").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::CapacityExceeded);

        let err = svc
            .prepare(&ctx, &VirtualPath::parse("/docs/missing.txt").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::PathNotFound);
    }
}
