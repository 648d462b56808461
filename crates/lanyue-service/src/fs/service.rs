//! Browsing and housekeeping of mounted directories.

use std::cmp::Ordering;

use serde::Serialize;
use tracing::{info, warn};

use lanyue_core::config::fs::FsConfig;
use lanyue_core::error::AppError;
use lanyue_core::result::AppResult;
use lanyue_core::types::{PageRequest, PageResponse, VirtualPath};
use lanyue_entity::storage::OrderField;
use lanyue_storage::thumbnail::{ThumbnailGenerator, ThumbnailScheduler};
use lanyue_storage::{DirEntry, Vfs};

use crate::context::RequestContext;

/// A directory entry as presented to file manager clients.
#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    #[serde(flatten)]
    pub entry: DirEntry,
    /// Web path of the cached thumbnail, when one exists.
    pub thumbnail: Option<String>,
}

/// File manager operations on virtual paths.
#[derive(Clone)]
pub struct FileService {
    vfs: Vfs,
    thumbnails: ThumbnailGenerator,
    config: FsConfig,
}

impl std::fmt::Debug for FileService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileService").finish()
    }
}

fn validate_name(name: &str) -> AppResult<()> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(AppError::validation(format!("Invalid name: '{name}'")));
    }
    Ok(())
}

fn compare(a: &DirEntry, b: &DirEntry, field: OrderField) -> Ordering {
    match field {
        OrderField::Name => a.name.cmp(&b.name),
        OrderField::Size => a.size.cmp(&b.size),
        OrderField::Modified => a.modified.cmp(&b.modified),
        OrderField::Created => a.created.cmp(&b.created),
        OrderField::FileType => a.mime_type.cmp(&b.mime_type),
    }
}

/// Directories first, then by `field`. `reverse` flips the field order
/// only; directories still lead.
fn sort_entries(entries: &mut [DirEntry], field: OrderField, reverse: bool) {
    entries.sort_by(|a, b| {
        b.is_dir.cmp(&a.is_dir).then_with(|| {
            let ord = compare(a, b, field);
            if reverse { ord.reverse() } else { ord }
        })
    });
}

impl FileService {
    pub fn new(vfs: Vfs, thumbnails: ThumbnailGenerator, config: FsConfig) -> Self {
        Self {
            vfs,
            thumbnails,
            config,
        }
    }

    /// Page request with the configured page size.
    pub fn page(&self, page: u64) -> PageRequest {
        PageRequest::new(page, self.config.page_size)
    }

    /// Attach the cached thumbnail of a file, scheduling its generation
    /// when it is missing.
    async fn present(&self, entry: DirEntry) -> FileEntry {
        if entry.is_dir || !self.thumbnails.enabled() {
            return FileEntry {
                entry,
                thumbnail: None,
            };
        }
        let thumbnail = match self.vfs.physical_path(&entry.path).await {
            Ok(syspath) => {
                let found = self.thumbnails.lookup(&syspath).await;
                if found.is_none() {
                    self.thumbnails.schedule(syspath);
                }
                found
            }
            Err(e) => {
                warn!(path = %entry.path, error = %e, "Cannot resolve file for thumbnail");
                None
            }
        };
        FileEntry { entry, thumbnail }
    }

    async fn present_all(&self, entries: Vec<DirEntry>) -> Vec<FileEntry> {
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            out.push(self.present(entry).await);
        }
        out
    }

    async fn sorted(
        &self,
        dir: &VirtualPath,
        mut entries: Vec<DirEntry>,
    ) -> AppResult<Vec<DirEntry>> {
        if let Some(mount) = dir.mount_name() {
            let point = self.vfs.mounts().get(mount).await?;
            sort_entries(&mut entries, point.order_field, point.reverse);
        }
        Ok(entries)
    }

    /// One page of a directory, ordered by the owning mount's settings.
    /// The root lists the mounts in table order.
    pub async fn list(
        &self,
        ctx: &RequestContext,
        dir: &VirtualPath,
        page: PageRequest,
    ) -> AppResult<PageResponse<FileEntry>> {
        ctx.require_admin()?;
        let entries = self.vfs.list(dir).await?;
        let entries = self.sorted(dir, entries).await?;
        let PageResponse {
            items,
            page,
            page_size,
            total_items,
            total_pages,
            has_next,
        } = PageResponse::from_items(entries, page);
        Ok(PageResponse {
            items: self.present_all(items).await,
            page,
            page_size,
            total_items,
            total_pages,
            has_next,
        })
    }

    /// Every file below a directory.
    pub async fn list_files(
        &self,
        ctx: &RequestContext,
        dir: &VirtualPath,
    ) -> AppResult<Vec<FileEntry>> {
        ctx.require_admin()?;
        let files = self.vfs.list_recursive(dir).await?;
        Ok(self.present_all(files).await)
    }

    /// One page of the child directories of `dir`.
    pub async fn list_dirs(
        &self,
        ctx: &RequestContext,
        dir: &VirtualPath,
        page: PageRequest,
    ) -> AppResult<PageResponse<DirEntry>> {
        ctx.require_admin()?;
        let dirs = self.vfs.list_dirs(dir).await?;
        let dirs = self.sorted(dir, dirs).await?;
        Ok(PageResponse::from_items(dirs, page))
    }

    /// Create `name` below `dir`, including missing parents of `dir`.
    pub async fn mkdir(
        &self,
        ctx: &RequestContext,
        dir: &VirtualPath,
        name: &str,
    ) -> AppResult<DirEntry> {
        ctx.require_admin()?;
        validate_name(name)?;
        let target = dir.join(name)?;
        self.vfs.make_dirs(&target).await?;
        info!(path = %target, "Created directory");
        self.vfs.metadata(&target).await
    }

    pub async fn rename(
        &self,
        ctx: &RequestContext,
        path: &VirtualPath,
        new_name: &str,
    ) -> AppResult<DirEntry> {
        ctx.require_admin()?;
        let target = self.vfs.rename(path, new_name).await?;
        self.vfs.metadata(&target).await
    }

    /// Entry metadata; directories report their aggregated size.
    pub async fn detail(&self, ctx: &RequestContext, path: &VirtualPath) -> AppResult<FileEntry> {
        ctx.require_admin()?;
        let entry = self.vfs.detail(path).await?;
        Ok(self.present(entry).await)
    }

    pub async fn move_entries(
        &self,
        ctx: &RequestContext,
        src_dir: &VirtualPath,
        dst_dir: &VirtualPath,
        names: &[String],
    ) -> AppResult<Vec<String>> {
        ctx.require_admin()?;
        self.vfs.move_entries(src_dir, dst_dir, names).await
    }

    pub async fn copy_entries(
        &self,
        ctx: &RequestContext,
        src_dir: &VirtualPath,
        dst_dir: &VirtualPath,
        names: &[String],
    ) -> AppResult<Vec<String>> {
        ctx.require_admin()?;
        self.vfs.copy_entries(src_dir, dst_dir, names).await
    }

    /// Delete the named entries of `dir`. Missing names are skipped.
    /// Returns the names that were removed.
    pub async fn remove_entries(
        &self,
        ctx: &RequestContext,
        dir: &VirtualPath,
        names: &[String],
    ) -> AppResult<Vec<String>> {
        ctx.require_admin()?;
        let mut removed = Vec::new();
        for name in names {
            validate_name(name)?;
            let target = dir.join(name)?;
            if !self.vfs.exists(&target).await? {
                continue;
            }
            self.vfs.remove(&target).await?;
            removed.push(name.clone());
        }
        info!(dir = %dir, count = removed.len(), "Removed entries");
        Ok(removed)
    }

    pub async fn clear_empty_dirs(
        &self,
        ctx: &RequestContext,
        dir: &VirtualPath,
    ) -> AppResult<u64> {
        ctx.require_admin()?;
        self.vfs.clear_empty_dirs(dir).await
    }

    /// Entries below `dir` named exactly `name`, either directories or
    /// files.
    pub async fn search(
        &self,
        ctx: &RequestContext,
        dir: &VirtualPath,
        name: &str,
        is_dir: bool,
        page: PageRequest,
    ) -> AppResult<PageResponse<DirEntry>> {
        ctx.require_admin()?;
        if name.is_empty() {
            return Err(AppError::validation("Search name cannot be empty"));
        }
        let found = self.vfs.search(dir, name, is_dir).await?;
        Ok(PageResponse::from_items(found, page))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lanyue_core::config::preview::PreviewConfig;
    use lanyue_entity::user::UserRole;
    use lanyue_storage::{LocalBackend, MountPoint, MountTable};

    use super::*;

    async fn service(root: &std::path::Path, field: OrderField, reverse: bool) -> FileService {
        let table = MountTable::new();
        table
            .mount(MountPoint {
                name: "docs".into(),
                backend: Arc::new(LocalBackend::new(root).await.unwrap()),
                capacity: 1 << 20,
                order_field: field,
                reverse,
            })
            .await
            .unwrap();
        let preview = PreviewConfig {
            thumbnail: false,
            ..PreviewConfig::default()
        };
        FileService::new(
            Vfs::new(table),
            ThumbnailGenerator::new(&preview),
            FsConfig {
                page_size: 2,
                ..FsConfig::default()
            },
        )
    }

    fn path(raw: &str) -> VirtualPath {
        VirtualPath::parse(raw).unwrap()
    }

    fn seed(root: &std::path::Path) {
        std::fs::create_dir(root.join("zeta")).unwrap();
        std::fs::create_dir(root.join("alpha")).unwrap();
        std::fs::write(root.join("b.txt"), b"12345").unwrap();
        std::fs::write(root.join("a.txt"), b"1").unwrap();
        std::fs::write(root.join("c.txt"), b"123").unwrap();
    }

    #[tokio::test]
    async fn test_list_puts_directories_first_and_pages() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let svc = service(dir.path(), OrderField::Name, false).await;
        let ctx = RequestContext::system();

        let first = svc.list(&ctx, &path("/docs"), svc.page(1)).await.unwrap();
        assert_eq!(first.total_items, 5);
        assert_eq!(first.total_pages, 3);
        let names: Vec<_> = first.items.iter().map(|e| e.entry.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);

        let second = svc.list(&ctx, &path("/docs"), svc.page(2)).await.unwrap();
        let names: Vec<_> = second.items.iter().map(|e| e.entry.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert!(second.items.iter().all(|e| e.thumbnail.is_none()));
    }

    #[tokio::test]
    async fn test_reverse_size_order_keeps_directories_first() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let svc = service(dir.path(), OrderField::Size, true).await;
        let ctx = RequestContext::system();

        let all = svc
            .list(&ctx, &path("/docs"), PageRequest::new(1, 100))
            .await
            .unwrap();
        let files: Vec<_> = all
            .items
            .iter()
            .filter(|e| !e.entry.is_dir)
            .map(|e| e.entry.name.as_str())
            .collect();
        assert!(all.items[0].entry.is_dir && all.items[1].entry.is_dir);
        assert_eq!(files, vec!["b.txt", "c.txt", "a.txt"]);
    }

    #[tokio::test]
    async fn test_mkdir_rename_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let svc = service(dir.path(), OrderField::Name, false).await;
        let ctx = RequestContext::system();

        let made = svc.mkdir(&ctx, &path("/docs/alpha"), "inner").await.unwrap();
        assert!(made.is_dir);
        assert!(dir.path().join("alpha/inner").is_dir());
        assert!(svc.mkdir(&ctx, &path("/docs"), "../x").await.is_err());

        let renamed = svc.rename(&ctx, &path("/docs/a.txt"), "d.txt").await.unwrap();
        assert_eq!(renamed.name, "d.txt");
        let err = svc.rename(&ctx, &path("/docs/d.txt"), "b.txt").await.unwrap_err();
        assert_eq!(err.kind, lanyue_core::ErrorKind::DuplicateName);

        let removed = svc
            .remove_entries(
                &ctx,
                &path("/docs"),
                &["d.txt".to_string(), "zeta".to_string(), "ghost".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(removed, vec!["d.txt", "zeta"]);
        assert!(!dir.path().join("zeta").exists());
    }

    #[tokio::test]
    async fn test_search_and_dirs() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        std::fs::write(dir.path().join("alpha/a.txt"), b"x").unwrap();
        let svc = service(dir.path(), OrderField::Name, false).await;
        let ctx = RequestContext::system();

        let found = svc
            .search(&ctx, &path("/docs"), "a.txt", false, svc.page(1))
            .await
            .unwrap();
        assert_eq!(found.total_items, 2);

        let dirs = svc
            .list_dirs(&ctx, &path("/docs"), svc.page(1))
            .await
            .unwrap();
        assert_eq!(dirs.items.len(), 2);
        assert!(dirs.items.iter().all(|e| e.is_dir));

        let files = svc.list_files(&ctx, &path("/docs")).await.unwrap();
        assert_eq!(files.len(), 4);
    }

    #[tokio::test]
    async fn test_non_admin_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path(), OrderField::Name, false).await;
        let ctx = RequestContext::new("2", "bob", UserRole::User);
        let err = svc.list(&ctx, &path("/docs"), svc.page(1)).await.unwrap_err();
        assert_eq!(err.kind, lanyue_core::ErrorKind::Authorization);
    }
}
