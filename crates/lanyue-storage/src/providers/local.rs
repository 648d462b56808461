//! Local filesystem storage backend.

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::debug;

use lanyue_core::error::{AppError, ErrorKind};
use lanyue_core::result::AppResult;
use lanyue_core::traits::storage::{ByteSink, EntryMeta, StorageBackend};

use super::mime_from_name;

/// A directory on the local filesystem used as a mount backend.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Open a backend rooted at `root_path`, creating the directory if needed.
    pub async fn new(root_path: impl AsRef<Path>) -> AppResult<Self> {
        let root = root_path.as_ref().to_path_buf();
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        let root = fs::canonicalize(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to resolve storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path under the root, refusing anything that
    /// would climb out of it.
    fn resolve(&self, path: &str) -> AppResult<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => {
                    return Err(AppError::validation(format!(
                        "Path escapes storage root: {path}"
                    )));
                }
            }
        }
        Ok(resolved)
    }

    async fn ensure_parent(&self, full_path: &Path) -> AppResult<()> {
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }
}

/// Map an I/O failure on `path`, reporting missing entries as
/// [`ErrorKind::PathNotFound`].
fn io_error(path: &str, action: &str, e: io::Error) -> AppError {
    if e.kind() == io::ErrorKind::NotFound {
        AppError::with_source(ErrorKind::PathNotFound, format!("Path not found: {path}"), e)
    } else {
        AppError::with_source(ErrorKind::Storage, format!("Failed to {action}: {path}"), e)
    }
}

fn join_relative(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{name}", parent.trim_end_matches('/'))
    }
}

/// Build entry metadata from filesystem metadata.
fn entry_meta(path: String, meta: &std::fs::Metadata) -> EntryMeta {
    let name = path.rsplit('/').next().unwrap_or_default().to_string();
    let is_dir = meta.is_dir();
    EntryMeta {
        mime_type: if is_dir { None } else { mime_from_name(&name) },
        name,
        path,
        is_dir,
        size: if is_dir { 0 } else { meta.len() },
        modified: meta.modified().ok().map(DateTime::<Utc>::from),
        created: meta.created().ok().map(DateTime::<Utc>::from),
    }
}

/// Give a directory owner read, write and search permission.
#[cfg(unix)]
fn normalize_dir_permissions(path: &Path, meta: &std::fs::Metadata) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = meta.permissions().mode();
    if mode & 0o700 != 0o700 {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode | 0o700))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn normalize_dir_permissions(path: &Path, meta: &std::fs::Metadata) -> io::Result<()> {
    let mut perms = meta.permissions();
    if perms.readonly() {
        perms.set_readonly(false);
        std::fs::set_permissions(path, perms)?;
    }
    Ok(())
}

/// Metadata of a directory entry, or `None` for a symbolic link. Links are
/// never followed while enumerating, so a link cannot pull content from
/// outside the root or loop back into it.
fn unlinked_meta(entry: &std::fs::DirEntry) -> io::Result<Option<std::fs::Metadata>> {
    if entry.file_type()?.is_symlink() {
        debug!(path = %entry.path().display(), "Skipping symbolic link");
        return Ok(None);
    }
    entry.metadata().map(Some)
}

/// Depth-first walk below `root/relative`, directories before their
/// contents. With `normalize` set, every directory gets its permission
/// bits fixed before it is read.
fn walk_blocking(root: &Path, relative: &str, normalize: bool) -> io::Result<Vec<EntryMeta>> {
    let start = if relative.is_empty() {
        root.to_path_buf()
    } else {
        root.join(relative)
    };
    if normalize {
        let meta = std::fs::metadata(&start)?;
        normalize_dir_permissions(&start, &meta)?;
    }

    let mut entries = Vec::new();
    let mut stack = vec![(start, relative.to_string())];
    while let Some((dir, rel)) = stack.pop() {
        let mut children = Vec::new();
        for child in std::fs::read_dir(&dir)? {
            let child = child?;
            let Some(meta) = unlinked_meta(&child)? else {
                continue;
            };
            let name = child.file_name().to_string_lossy().to_string();
            let child_rel = join_relative(&rel, &name);
            if meta.is_dir() {
                let child_path = child.path();
                if normalize {
                    normalize_dir_permissions(&child_path, &meta)?;
                }
                children.push((child_path, child_rel.clone()));
            }
            entries.push(entry_meta(child_rel, &meta));
        }
        // Reverse so the stack pops children in directory order.
        stack.extend(children.into_iter().rev());
    }
    Ok(entries)
}

/// Entries directly inside `dir`, named relative to the backend root.
fn list_blocking(dir: &Path, parent: &str) -> io::Result<Vec<EntryMeta>> {
    let mut entries = Vec::new();
    for child in std::fs::read_dir(dir)? {
        let child = child?;
        if let Some(meta) = unlinked_meta(&child)? {
            let name = child.file_name().to_string_lossy().to_string();
            entries.push(entry_meta(join_relative(parent, &name), &meta));
        }
    }
    Ok(entries)
}

/// Copy a file or a whole directory tree, overwriting existing files.
/// Symbolic links inside a copied tree are left behind.
pub fn copy_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    let meta = std::fs::metadata(src)?;
    if !meta.is_dir() {
        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(src, dst)?;
        return Ok(());
    }
    std::fs::create_dir_all(dst)?;
    for child in std::fs::read_dir(src)? {
        let child = child?;
        if unlinked_meta(&child)?.is_some() {
            copy_recursive(&child.path(), &dst.join(child.file_name()))?;
        }
    }
    Ok(())
}

async fn blocking<T: Send + 'static>(
    f: impl FnOnce() -> io::Result<T> + Send + 'static,
) -> io::Result<T> {
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| io::Error::other(format!("blocking task failed: {e}")))?
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn backend_type(&self) -> &str {
        "local"
    }

    fn syspath(&self, path: &str) -> AppResult<PathBuf> {
        self.resolve(path)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        let full_path = self.resolve(path)?;
        Ok(fs::try_exists(&full_path).await.unwrap_or(false))
    }

    async fn is_dir(&self, path: &str) -> AppResult<bool> {
        let full_path = self.resolve(path)?;
        Ok(fs::metadata(&full_path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }

    async fn metadata(&self, path: &str) -> AppResult<EntryMeta> {
        let full_path = self.resolve(path)?;
        let meta = fs::metadata(&full_path)
            .await
            .map_err(|e| io_error(path, "read metadata", e))?;
        let mut entry = entry_meta(path.trim_matches('/').to_string(), &meta);
        if entry.name.is_empty() {
            entry.name = self
                .root
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
        }
        Ok(entry)
    }

    async fn list(&self, path: &str) -> AppResult<Vec<EntryMeta>> {
        let full_path = self.resolve(path)?;
        let parent = path.trim_matches('/').to_string();
        blocking(move || list_blocking(&full_path, &parent))
            .await
            .map_err(|e| io_error(path, "list directory", e))
    }

    async fn walk(&self, path: &str) -> AppResult<Vec<EntryMeta>> {
        let root = self.root.clone();
        let relative = self.resolve(path).map(|_| path.trim_matches('/').to_string())?;
        let owned = relative.clone();
        blocking(move || walk_blocking(&root, &owned, false))
            .await
            .map_err(|e| io_error(&relative, "walk directory", e))
    }

    async fn create_dir_all(&self, path: &str) -> AppResult<()> {
        let full_path = self.resolve(path)?;
        fs::create_dir_all(&full_path)
            .await
            .map_err(|e| io_error(path, "create directory", e))
    }

    async fn create_file(&self, path: &str, overwrite: bool) -> AppResult<bool> {
        let full_path = self.resolve(path)?;
        self.ensure_parent(&full_path).await?;

        let mut options = fs::OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        match options.open(&full_path).await {
            Ok(_) => {
                debug!(path, overwrite, "Created empty file");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(io_error(path, "create file", e)),
        }
    }

    async fn open_append(&self, path: &str) -> AppResult<ByteSink> {
        let full_path = self.resolve(path)?;
        let file = fs::OpenOptions::new()
            .append(true)
            .open(&full_path)
            .await
            .map_err(|e| io_error(path, "open file for append", e))?;
        Ok(Box::pin(file))
    }

    async fn file_size(&self, path: &str) -> AppResult<Option<u64>> {
        let full_path = self.resolve(path)?;
        match fs::metadata(&full_path).await {
            Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(path, "read metadata", e)),
        }
    }

    async fn dir_size(&self, path: &str) -> AppResult<(u64, u64)> {
        let root = self.root.clone();
        let relative = self.resolve(path).map(|_| path.trim_matches('/').to_string())?;
        let owned = relative.clone();
        let entries = blocking(move || walk_blocking(&root, &owned, true))
            .await
            .map_err(|e| io_error(&relative, "compute directory size", e))?;
        Ok(entries
            .iter()
            .filter(|e| !e.is_dir)
            .fold((0, 0), |(bytes, count), e| (bytes + e.size, count + 1)))
    }

    async fn ensure_writable(&self, path: &str) -> AppResult<()> {
        let full_path = self.resolve(path)?;
        let meta = fs::metadata(&full_path)
            .await
            .map_err(|e| io_error(path, "read metadata", e))?;
        let mut perms = meta.permissions();

        #[cfg(unix)]
        let needs_fix = {
            use std::os::unix::fs::PermissionsExt;
            let mode = perms.mode();
            if mode & 0o200 == 0 {
                perms.set_mode(mode | 0o200);
                true
            } else {
                false
            }
        };
        #[cfg(not(unix))]
        let needs_fix = {
            let readonly = perms.readonly();
            perms.set_readonly(false);
            readonly
        };

        if needs_fix {
            fs::set_permissions(&full_path, perms)
                .await
                .map_err(|e| io_error(path, "set permissions", e))?;
            debug!(path, "Granted owner write permission");
        }
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> AppResult<()> {
        let full_path = self.resolve(path)?;
        fs::remove_file(&full_path)
            .await
            .map_err(|e| io_error(path, "delete file", e))
    }

    async fn remove_dir_all(&self, path: &str) -> AppResult<()> {
        let full_path = self.resolve(path)?;
        if full_path == self.root {
            return Err(AppError::validation("Refusing to delete a storage root"));
        }
        fs::remove_dir_all(&full_path)
            .await
            .map_err(|e| io_error(path, "delete directory", e))
    }

    async fn remove_empty_dir(&self, path: &str) -> AppResult<bool> {
        let full_path = self.resolve(path)?;
        match fs::remove_dir(&full_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::DirectoryNotEmpty => Ok(false),
            Err(e) => Err(io_error(path, "delete directory", e)),
        }
    }

    async fn rename(&self, from: &str, to: &str) -> AppResult<()> {
        let from_path = self.resolve(from)?;
        let to_path = self.resolve(to)?;
        self.ensure_parent(&to_path).await?;

        fs::rename(&from_path, &to_path)
            .await
            .map_err(|e| io_error(from, &format!("rename to {to}"), e))
    }

    async fn copy(&self, from: &str, to: &str) -> AppResult<()> {
        let from_path = self.resolve(from)?;
        let to_path = self.resolve(to)?;
        blocking(move || copy_recursive(&from_path, &to_path))
            .await
            .map_err(|e| io_error(from, &format!("copy to {to}"), e))
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncWriteExt;

    use super::*;

    async fn backend() -> (tempfile::TempDir, LocalBackend) {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path()).await.unwrap();
        (dir, backend)
    }

    #[tokio::test]
    async fn test_create_append_size() {
        let (_dir, backend) = backend().await;

        assert!(backend.create_file("a/b.txt", false).await.unwrap());
        assert!(!backend.create_file("a/b.txt", false).await.unwrap());

        let mut sink = backend.open_append("a/b.txt").await.unwrap();
        sink.write_all(b"hello").await.unwrap();
        sink.flush().await.unwrap();
        drop(sink);
        assert_eq!(backend.file_size("a/b.txt").await.unwrap(), Some(5));

        assert!(backend.create_file("a/b.txt", true).await.unwrap());
        assert_eq!(backend.file_size("a/b.txt").await.unwrap(), Some(0));
        assert_eq!(backend.file_size("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rejects_escape() {
        let (_dir, backend) = backend().await;
        let err = backend.syspath("../outside").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(backend.exists("a/../../b").await.is_err());
    }

    #[tokio::test]
    async fn test_list_and_walk() {
        let (dir, backend) = backend().await;
        std::fs::create_dir_all(dir.path().join("x/y")).unwrap();
        std::fs::write(dir.path().join("x/one.txt"), b"1").unwrap();
        std::fs::write(dir.path().join("x/y/two.txt"), b"22").unwrap();

        let listed = backend.list("x").await.unwrap();
        assert_eq!(listed.len(), 2);

        let walked = backend.walk("x").await.unwrap();
        let mut paths: Vec<_> = walked.iter().map(|e| e.path.clone()).collect();
        paths.sort();
        assert_eq!(paths, vec!["x/one.txt", "x/y", "x/y/two.txt"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dir_size_normalizes_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, backend) = backend().await;
        let locked = dir.path().join("locked");
        std::fs::create_dir_all(&locked).unwrap();
        std::fs::write(locked.join("f.bin"), vec![0u8; 300]).unwrap();
        std::fs::write(dir.path().join("g.bin"), vec![0u8; 200]).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        let (bytes, files) = backend.dir_size("").await.unwrap();
        assert_eq!((bytes, files), (500, 2));
        let mode = std::fs::metadata(&locked).unwrap().permissions().mode();
        assert_eq!(mode & 0o700, 0o700);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ensure_writable() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, backend) = backend().await;
        let file = dir.path().join("ro.txt");
        std::fs::write(&file, b"x").unwrap();
        std::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o444)).unwrap();

        backend.ensure_writable("ro.txt").await.unwrap();
        let mode = std::fs::metadata(&file).unwrap().permissions().mode();
        assert_ne!(mode & 0o200, 0);
    }

    #[tokio::test]
    async fn test_copy_rename_remove() {
        let (dir, backend) = backend().await;
        std::fs::create_dir_all(dir.path().join("src/inner")).unwrap();
        std::fs::write(dir.path().join("src/inner/f.txt"), b"content").unwrap();

        backend.copy("src", "dst").await.unwrap();
        assert_eq!(backend.file_size("dst/inner/f.txt").await.unwrap(), Some(7));

        backend.rename("dst", "moved").await.unwrap();
        assert!(!backend.exists("dst").await.unwrap());
        assert!(backend.is_dir("moved/inner").await.unwrap());

        assert!(!backend.remove_empty_dir("moved").await.unwrap());
        backend.remove_dir_all("moved").await.unwrap();
        assert!(!backend.exists("moved").await.unwrap());
        assert!(backend.remove_dir_all("").await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_walk_skips_symbolic_links() {
        use std::os::unix::fs::symlink;

        let (dir, backend) = backend().await;
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.bin"), vec![0u8; 900]).unwrap();

        std::fs::create_dir_all(dir.path().join("a")).unwrap();
        std::fs::write(dir.path().join("a/f.bin"), vec![0u8; 40]).unwrap();
        symlink(dir.path(), dir.path().join("a/loop")).unwrap();
        symlink(outside.path(), dir.path().join("a/out")).unwrap();
        symlink(outside.path().join("secret.bin"), dir.path().join("secret.bin")).unwrap();

        assert_eq!(backend.dir_size("").await.unwrap(), (40, 1));

        let mut walked: Vec<_> = backend
            .walk("")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.path)
            .collect();
        walked.sort();
        assert_eq!(walked, vec!["a", "a/f.bin"]);

        let listed = backend.list("a").await.unwrap();
        assert_eq!(listed.len(), 1);

        backend.copy("a", "b").await.unwrap();
        assert_eq!(backend.file_size("b/f.bin").await.unwrap(), Some(40));
        assert!(!backend.exists("b/loop").await.unwrap());
    }
}
