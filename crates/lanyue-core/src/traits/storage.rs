//! Storage backend trait for the physical directories behind each mount.

use std::path::PathBuf;
use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWrite;

use crate::result::AppResult;

/// Metadata about one entry inside a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMeta {
    /// Final path component.
    pub name: String,
    /// Path relative to the backend root, `/`-separated, without a leading `/`.
    pub path: String,
    /// Whether this is a directory.
    pub is_dir: bool,
    /// Size in bytes; always 0 for directories.
    pub size: u64,
    /// Last modified timestamp.
    pub modified: Option<DateTime<Utc>>,
    /// Creation timestamp, when the platform reports one.
    pub created: Option<DateTime<Utc>>,
    /// Media type inferred from the name, for files only.
    pub mime_type: Option<String>,
}

/// Append-only byte sink returned by [`StorageBackend::open_append`].
pub type ByteSink = Pin<Box<dyn AsyncWrite + Send>>;

/// Trait for physical storage backends mounted into the virtual namespace.
///
/// Every `path` argument is relative to the backend root and uses `/` as
/// separator; the empty string denotes the root itself. Implementations
/// must refuse any path that resolves outside their root.
#[async_trait]
pub trait StorageBackend: Send + Sync + std::fmt::Debug + 'static {
    /// Return the backend type name (e.g. `"local"`).
    fn backend_type(&self) -> &str;

    /// Map a relative path to the real filesystem path.
    fn syspath(&self, path: &str) -> AppResult<PathBuf>;

    /// Check whether the backend root is present and usable.
    async fn health_check(&self) -> AppResult<bool>;

    async fn exists(&self, path: &str) -> AppResult<bool>;

    async fn is_dir(&self, path: &str) -> AppResult<bool>;

    async fn metadata(&self, path: &str) -> AppResult<EntryMeta>;

    /// Direct children of a directory.
    async fn list(&self, path: &str) -> AppResult<Vec<EntryMeta>>;

    /// Every descendant of a directory, depth-first, directories included.
    async fn walk(&self, path: &str) -> AppResult<Vec<EntryMeta>>;

    /// Create a directory and any missing parents.
    async fn create_dir_all(&self, path: &str) -> AppResult<()>;

    /// Create an empty file. Returns `false` if the file already exists and
    /// `overwrite` is not set; truncates it otherwise.
    async fn create_file(&self, path: &str, overwrite: bool) -> AppResult<bool>;

    /// Open an existing file for appending.
    async fn open_append(&self, path: &str) -> AppResult<ByteSink>;

    /// Size in bytes of a file, or `None` if it does not exist.
    async fn file_size(&self, path: &str) -> AppResult<Option<u64>>;

    /// Total file bytes and file count below a directory.
    ///
    /// Directory permission bits are normalized before the walk so that
    /// entries left restrictive by earlier operations can be traversed.
    async fn dir_size(&self, path: &str) -> AppResult<(u64, u64)>;

    /// Grant the owner write permission on a file if it is missing.
    async fn ensure_writable(&self, path: &str) -> AppResult<()>;

    async fn remove_file(&self, path: &str) -> AppResult<()>;

    async fn remove_dir_all(&self, path: &str) -> AppResult<()>;

    /// Remove a directory only if it is empty.
    async fn remove_empty_dir(&self, path: &str) -> AppResult<bool>;

    /// Rename within this backend.
    async fn rename(&self, from: &str, to: &str) -> AppResult<()>;

    /// Copy a file or a whole directory tree within this backend.
    async fn copy(&self, from: &str, to: &str) -> AppResult<()>;
}
