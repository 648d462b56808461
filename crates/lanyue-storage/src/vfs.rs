//! The virtual filesystem façade.
//!
//! [`Vfs`] is the single entry point for operations on virtual paths. It
//! routes every call through the [`MountTable`] and applies the policies
//! that span mounts: capacity checks for transfers, write-permission
//! normalization before files are handed out, and protection of the
//! synthetic root.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use lanyue_core::error::AppError;
use lanyue_core::result::AppResult;
use lanyue_core::traits::storage::{ByteSink, EntryMeta};
use lanyue_core::types::VirtualPath;

use crate::mount::{MountPoint, MountTable};
use crate::providers::local::copy_recursive;

/// One entry of a virtual directory. Derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirEntry {
    pub name: String,
    pub path: VirtualPath,
    pub parent: VirtualPath,
    pub is_dir: bool,
    /// Size in bytes; 0 for directories.
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub created: Option<DateTime<Utc>>,
    pub mime_type: Option<String>,
}

impl DirEntry {
    fn from_meta(mount: &str, meta: EntryMeta) -> AppResult<Self> {
        let path = VirtualPath::root().join(mount)?.join(&meta.path)?;
        let parent = path.parent().unwrap_or_default();
        Ok(Self {
            name: meta.name,
            path,
            parent,
            is_dir: meta.is_dir,
            size: meta.size,
            modified: meta.modified,
            created: meta.created,
            mime_type: meta.mime_type,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transfer {
    Move,
    Copy,
}

/// Unified view over every mounted backend.
#[derive(Debug, Clone, Default)]
pub struct Vfs {
    mounts: MountTable,
}

impl Vfs {
    pub fn new(mounts: MountTable) -> Self {
        Self { mounts }
    }

    pub fn mounts(&self) -> &MountTable {
        &self.mounts
    }

    /// Reject the synthetic root and mount roots as mutation targets.
    fn ensure_mutable(path: &VirtualPath) -> AppResult<()> {
        if path.is_root() || path.is_mount_root() {
            return Err(AppError::validation(format!("'{path}' cannot be modified")));
        }
        Ok(())
    }

    pub async fn exists(&self, path: &VirtualPath) -> AppResult<bool> {
        if path.is_root() {
            return Ok(true);
        }
        match self.mounts.resolve(path).await {
            Ok((point, sub)) => point.backend.exists(&sub).await,
            Err(e) if e.is(lanyue_core::ErrorKind::PathNotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn is_dir(&self, path: &VirtualPath) -> AppResult<bool> {
        if path.is_root() {
            return Ok(true);
        }
        let (point, sub) = self.mounts.resolve(path).await?;
        point.backend.is_dir(&sub).await
    }

    /// Metadata of a single entry. The root and mount roots are reported
    /// as directories.
    pub async fn metadata(&self, path: &VirtualPath) -> AppResult<DirEntry> {
        if path.is_root() {
            return Ok(DirEntry {
                name: String::new(),
                path: VirtualPath::root(),
                parent: VirtualPath::root(),
                is_dir: true,
                size: 0,
                modified: None,
                created: None,
                mime_type: None,
            });
        }
        let (point, sub) = self.mounts.resolve(path).await?;
        let meta = point.backend.metadata(&sub).await?;
        let mut entry = DirEntry::from_meta(&point.name, meta)?;
        if path.is_mount_root() {
            entry.name = point.name.clone();
        }
        Ok(entry)
    }

    /// Direct children of a directory. Files that are not writable get
    /// their owner write bit restored before they are returned.
    pub async fn list(&self, dir: &VirtualPath) -> AppResult<Vec<DirEntry>> {
        if dir.is_root() {
            return self.list_mounts().await;
        }
        let (point, sub) = self.mounts.resolve(dir).await?;
        if !point.backend.is_dir(&sub).await? {
            return Err(AppError::path_not_found(dir));
        }
        let mut entries = Vec::new();
        for meta in point.backend.list(&sub).await? {
            if !meta.is_dir {
                point.backend.ensure_writable(&meta.path).await?;
            }
            entries.push(DirEntry::from_meta(&point.name, meta)?);
        }
        Ok(entries)
    }

    async fn list_mounts(&self) -> AppResult<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for point in self.mounts.list().await {
            let meta = point.backend.metadata("").await?;
            entries.push(DirEntry {
                name: point.name.clone(),
                path: VirtualPath::root().join(&point.name)?,
                parent: VirtualPath::root(),
                is_dir: true,
                size: 0,
                modified: meta.modified,
                created: meta.created,
                mime_type: None,
            });
        }
        Ok(entries)
    }

    /// Direct child directories of `dir`.
    pub async fn list_dirs(&self, dir: &VirtualPath) -> AppResult<Vec<DirEntry>> {
        Ok(self
            .list(dir)
            .await?
            .into_iter()
            .filter(|e| e.is_dir)
            .collect())
    }

    /// Metadata of an entry. Directories report the aggregated size of
    /// every file below them.
    pub async fn detail(&self, path: &VirtualPath) -> AppResult<DirEntry> {
        let mut entry = self.metadata(path).await?;
        if entry.is_dir {
            entry.size = self.get_dir_size(path).await?.0;
        }
        Ok(entry)
    }

    /// Every file below a directory, depth-first. Directories are skipped.
    pub async fn list_recursive(&self, dir: &VirtualPath) -> AppResult<Vec<DirEntry>> {
        Ok(self
            .walk(dir)
            .await?
            .into_iter()
            .filter(|e| !e.is_dir)
            .collect())
    }

    /// Every descendant of a directory, depth-first.
    pub async fn walk(&self, dir: &VirtualPath) -> AppResult<Vec<DirEntry>> {
        let points = if dir.is_root() {
            self.mounts
                .list()
                .await
                .into_iter()
                .map(|p| (p, String::new()))
                .collect()
        } else {
            vec![self.mounts.resolve(dir).await?]
        };
        let mut entries = Vec::new();
        for (point, sub) in points {
            for meta in point.backend.walk(&sub).await? {
                entries.push(DirEntry::from_meta(&point.name, meta)?);
            }
        }
        Ok(entries)
    }

    /// Create a directory and any missing parents.
    pub async fn make_dirs(&self, path: &VirtualPath) -> AppResult<()> {
        if path.is_root() {
            return Err(AppError::validation("The root directory cannot be modified"));
        }
        let (point, sub) = self.mounts.resolve(path).await?;
        point.backend.create_dir_all(&sub).await
    }

    /// Rename an entry within its directory and return the new path.
    pub async fn rename(&self, path: &VirtualPath, new_name: &str) -> AppResult<VirtualPath> {
        Self::ensure_mutable(path)?;
        if new_name.is_empty() || new_name.contains('/') || new_name == "." || new_name == ".." {
            return Err(AppError::validation(format!("Invalid name: '{new_name}'")));
        }
        let target = path
            .parent()
            .ok_or_else(|| AppError::path_not_found(path))?
            .join(new_name)?;
        let (point, sub) = self.mounts.resolve(path).await?;
        if !point.backend.exists(&sub).await? {
            return Err(AppError::path_not_found(path));
        }
        let target_sub = target.sub_path();
        if point.backend.exists(&target_sub).await? {
            return Err(AppError::duplicate_name(new_name));
        }
        point.backend.rename(&sub, &target_sub).await?;
        info!(from = %path, to = %target, "Renamed entry");
        Ok(target)
    }

    /// Move one entry. Fails with a duplicate-name error if `dst` exists
    /// and `overwrite` is not set.
    pub async fn move_path(
        &self,
        src: &VirtualPath,
        dst: &VirtualPath,
        overwrite: bool,
    ) -> AppResult<()> {
        self.transfer(Transfer::Move, &[(src.clone(), dst.clone())], overwrite)
            .await
    }

    /// Copy one entry. Fails with a duplicate-name error if `dst` exists
    /// and `overwrite` is not set.
    pub async fn copy_path(
        &self,
        src: &VirtualPath,
        dst: &VirtualPath,
        overwrite: bool,
    ) -> AppResult<()> {
        self.transfer(Transfer::Copy, &[(src.clone(), dst.clone())], overwrite)
            .await
    }

    /// Move the named entries of `src_dir` into `dst_dir`.
    ///
    /// Names missing from the source or already present in the destination
    /// are skipped. Returns the names that were moved.
    pub async fn move_entries(
        &self,
        src_dir: &VirtualPath,
        dst_dir: &VirtualPath,
        names: &[String],
    ) -> AppResult<Vec<String>> {
        self.transfer_entries(Transfer::Move, src_dir, dst_dir, names)
            .await
    }

    /// Copy the named entries of `src_dir` into `dst_dir`, skipping names
    /// like [`Vfs::move_entries`]. Returns the names that were copied.
    pub async fn copy_entries(
        &self,
        src_dir: &VirtualPath,
        dst_dir: &VirtualPath,
        names: &[String],
    ) -> AppResult<Vec<String>> {
        self.transfer_entries(Transfer::Copy, src_dir, dst_dir, names)
            .await
    }

    async fn transfer_entries(
        &self,
        kind: Transfer,
        src_dir: &VirtualPath,
        dst_dir: &VirtualPath,
        names: &[String],
    ) -> AppResult<Vec<String>> {
        let mut selected = Vec::new();
        let mut pairs = Vec::new();
        for name in names {
            let src = src_dir.join(name)?;
            let dst = dst_dir.join(name)?;
            if selected.contains(name) || !self.exists(&src).await? || self.exists(&dst).await? {
                continue;
            }
            selected.push(name.clone());
            pairs.push((src, dst));
        }
        self.transfer(kind, &pairs, false).await?;
        Ok(selected)
    }

    /// Validate, capacity-check and then execute a batch of transfers.
    /// Nothing moves unless the whole batch passes the checks.
    async fn transfer(
        &self,
        kind: Transfer,
        pairs: &[(VirtualPath, VirtualPath)],
        overwrite: bool,
    ) -> AppResult<()> {
        let mut resolved = Vec::with_capacity(pairs.len());
        let mut incoming: Vec<(MountPoint, u64, bool)> = Vec::new();

        for (src, dst) in pairs {
            Self::ensure_mutable(src)?;
            Self::ensure_mutable(dst)?;
            if dst.starts_with(src) {
                return Err(AppError::validation(format!(
                    "Cannot place '{src}' inside itself"
                )));
            }
            let (src_point, src_sub) = self.mounts.resolve(src).await?;
            let (dst_point, dst_sub) = self.mounts.resolve(dst).await?;
            if !src_point.backend.exists(&src_sub).await? {
                return Err(AppError::path_not_found(src));
            }
            if dst_point.backend.exists(&dst_sub).await? && !overwrite {
                return Err(AppError::duplicate_name(dst));
            }

            let size = if src_point.backend.is_dir(&src_sub).await? {
                src_point.backend.dir_size(&src_sub).await?.0
            } else {
                src_point.backend.file_size(&src_sub).await?.unwrap_or(0)
            };
            // Moves inside one mount do not grow it.
            let grows = kind == Transfer::Copy || src_point.name != dst_point.name;
            match incoming.iter_mut().find(|(p, _, _)| p.name == dst_point.name) {
                Some(slot) if grows => slot.1 += size,
                Some(_) => {}
                None => incoming.push((dst_point.clone(), if grows { size } else { 0 }, grows)),
            }
            resolved.push((src.clone(), dst.clone(), src_point, src_sub, dst_point, dst_sub));
        }

        for (point, batch_bytes, grows) in &incoming {
            if !grows {
                continue;
            }
            let (used, _) = point.backend.dir_size("").await?;
            if used + batch_bytes > point.capacity {
                return Err(AppError::insufficient_capacity(format!(
                    "Storage '{}' has {} of {} bytes in use; {} more do not fit",
                    point.name, used, point.capacity, batch_bytes
                )));
            }
        }

        for (src, dst, src_point, src_sub, dst_point, dst_sub) in resolved {
            if overwrite && dst_point.backend.exists(&dst_sub).await? {
                self.remove_any(&dst_point, &dst_sub).await?;
            }
            match (kind, src_point.name == dst_point.name) {
                (Transfer::Move, true) => src_point.backend.rename(&src_sub, &dst_sub).await?,
                (Transfer::Copy, true) => src_point.backend.copy(&src_sub, &dst_sub).await?,
                (Transfer::Move, false) => {
                    let from = src_point.backend.syspath(&src_sub)?;
                    let to = dst_point.backend.syspath(&dst_sub)?;
                    if let Some(parent) = to.parent() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                    if let Err(e) = tokio::fs::rename(&from, &to).await {
                        debug!(error = %e, "Rename across mounts failed, copying instead");
                        copy_across(from, to).await?;
                        self.remove_any(&src_point, &src_sub).await?;
                    }
                }
                (Transfer::Copy, false) => {
                    let from = src_point.backend.syspath(&src_sub)?;
                    let to = dst_point.backend.syspath(&dst_sub)?;
                    copy_across(from, to).await?;
                }
            }
            info!(?kind, from = %src, to = %dst, "Transferred entry");
        }
        Ok(())
    }

    async fn remove_any(&self, point: &MountPoint, sub: &str) -> AppResult<()> {
        if point.backend.is_dir(sub).await? {
            point.backend.remove_dir_all(sub).await
        } else {
            point.backend.remove_file(sub).await
        }
    }

    pub async fn remove_file(&self, path: &VirtualPath) -> AppResult<()> {
        Self::ensure_mutable(path)?;
        let (point, sub) = self.mounts.resolve(path).await?;
        point.backend.remove_file(&sub).await
    }

    pub async fn remove_tree(&self, path: &VirtualPath) -> AppResult<()> {
        Self::ensure_mutable(path)?;
        let (point, sub) = self.mounts.resolve(path).await?;
        point.backend.remove_dir_all(&sub).await
    }

    /// Remove a file or a directory tree.
    pub async fn remove(&self, path: &VirtualPath) -> AppResult<()> {
        Self::ensure_mutable(path)?;
        let (point, sub) = self.mounts.resolve(path).await?;
        self.remove_any(&point, &sub).await
    }

    /// Size of a file in bytes.
    pub async fn get_size(&self, path: &VirtualPath) -> AppResult<u64> {
        self.file_size(path)
            .await?
            .ok_or_else(|| AppError::path_not_found(path))
    }

    /// Size of a file, or `None` if nothing exists at `path`.
    pub async fn file_size(&self, path: &VirtualPath) -> AppResult<Option<u64>> {
        let (point, sub) = self.mounts.resolve(path).await?;
        point.backend.file_size(&sub).await
    }

    /// Total file bytes and file count below a directory.
    pub async fn get_dir_size(&self, path: &VirtualPath) -> AppResult<(u64, u64)> {
        self.mounts.dir_size(path).await
    }

    /// Create an empty file. Returns `false` if one already exists and
    /// `overwrite` is not set.
    pub async fn create_file(&self, path: &VirtualPath, overwrite: bool) -> AppResult<bool> {
        Self::ensure_mutable(path)?;
        let (point, sub) = self.mounts.resolve(path).await?;
        point.backend.create_file(&sub, overwrite).await
    }

    /// Open an existing file for appending.
    pub async fn open_append(&self, path: &VirtualPath) -> AppResult<ByteSink> {
        Self::ensure_mutable(path)?;
        let (point, sub) = self.mounts.resolve(path).await?;
        point.backend.open_append(&sub).await
    }

    /// Real filesystem path of a virtual path on its active backend.
    pub async fn physical_path(&self, path: &VirtualPath) -> AppResult<PathBuf> {
        let (point, sub) = self.mounts.resolve(path).await?;
        point.backend.syspath(&sub)
    }

    /// Entries below `dir` whose name equals `name` exactly, restricted to
    /// directories or to files.
    pub async fn search(
        &self,
        dir: &VirtualPath,
        name: &str,
        dirs: bool,
    ) -> AppResult<Vec<DirEntry>> {
        Ok(self
            .walk(dir)
            .await?
            .into_iter()
            .filter(|e| e.is_dir == dirs && e.name == name)
            .collect())
    }

    /// Remove every empty directory below `dir`, deepest first, so that
    /// directories emptied by the pass are removed too. Returns how many
    /// were removed.
    pub async fn clear_empty_dirs(&self, dir: &VirtualPath) -> AppResult<u64> {
        if dir.is_root() {
            return Err(AppError::validation("The root directory cannot be modified"));
        }
        let (point, sub) = self.mounts.resolve(dir).await?;
        let mut dirs: Vec<EntryMeta> = point
            .backend
            .walk(&sub)
            .await?
            .into_iter()
            .filter(|e| e.is_dir)
            .collect();
        dirs.sort_by_key(|e| std::cmp::Reverse(e.path.matches('/').count()));

        let mut removed = 0;
        for entry in dirs {
            match point.backend.remove_empty_dir(&entry.path).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => warn!(path = %entry.path, error = %e, "Failed to remove empty directory"),
            }
        }
        info!(dir = %dir, removed, "Cleared empty directories");
        Ok(removed)
    }
}

async fn copy_across(from: PathBuf, to: PathBuf) -> AppResult<()> {
    tokio::task::spawn_blocking(move || copy_recursive(&from, &to))
        .await
        .map_err(|e| AppError::internal(format!("Copy task failed: {e}")))??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lanyue_core::error::ErrorKind;
    use lanyue_entity::storage::OrderField;

    use super::*;
    use crate::providers::local::LocalBackend;

    struct Fixture {
        _dirs: Vec<tempfile::TempDir>,
        vfs: Vfs,
    }

    async fn fixture(capacities: &[(&str, u64)]) -> Fixture {
        let table = MountTable::new();
        let mut dirs = Vec::new();
        for (name, capacity) in capacities {
            let dir = tempfile::tempdir().unwrap();
            table
                .mount(MountPoint {
                    name: name.to_string(),
                    backend: Arc::new(LocalBackend::new(dir.path()).await.unwrap()),
                    capacity: *capacity,
                    order_field: OrderField::Name,
                    reverse: false,
                })
                .await
                .unwrap();
            dirs.push(dir);
        }
        Fixture {
            _dirs: dirs,
            vfs: Vfs::new(table),
        }
    }

    fn vp(raw: &str) -> VirtualPath {
        VirtualPath::parse(raw).unwrap()
    }

    async fn write(vfs: &Vfs, path: &str, bytes: usize) {
        let path = vp(path);
        vfs.make_dirs(&path.parent().unwrap()).await.unwrap();
        let sys = vfs.physical_path(&path).await.unwrap();
        std::fs::write(sys, vec![7u8; bytes]).unwrap();
    }

    #[tokio::test]
    async fn test_root_lists_mounts_and_is_protected() {
        let f = fixture(&[("a", 100), ("b", 100)]).await;
        let names: Vec<_> = f
            .vfs
            .list(&VirtualPath::root())
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);

        assert!(f.vfs.remove_tree(&vp("/a")).await.is_err());
        assert!(f.vfs.rename(&vp("/a"), "c").await.is_err());
        assert!(f.vfs.create_file(&VirtualPath::root(), true).await.is_err());
    }

    #[tokio::test]
    async fn test_rename_rejects_existing_sibling() {
        let f = fixture(&[("a", 100)]).await;
        write(&f.vfs, "/a/x.txt", 1).await;
        write(&f.vfs, "/a/y.txt", 1).await;

        let err = f.vfs.rename(&vp("/a/x.txt"), "y.txt").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateName);

        let renamed = f.vfs.rename(&vp("/a/x.txt"), "z.txt").await.unwrap();
        assert_eq!(renamed, vp("/a/z.txt"));
        assert!(f.vfs.exists(&renamed).await.unwrap());
    }

    #[tokio::test]
    async fn test_cross_mount_move_checks_capacity() {
        let f = fixture(&[("a", 1000), ("b", 100)]).await;
        write(&f.vfs, "/a/big.bin", 80).await;
        write(&f.vfs, "/a/dir/one.bin", 30).await;
        write(&f.vfs, "/b/existing.bin", 10).await;

        let names = vec!["big.bin".to_string(), "dir".to_string()];
        let err = f
            .vfs
            .move_entries(&vp("/a"), &vp("/b"), &names)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InsufficientCapacity);
        // Nothing moved.
        assert!(f.vfs.exists(&vp("/a/big.bin")).await.unwrap());
        assert!(f.vfs.exists(&vp("/a/dir/one.bin")).await.unwrap());

        let moved = f
            .vfs
            .move_entries(&vp("/a"), &vp("/b"), &["big.bin".to_string()])
            .await
            .unwrap();
        assert_eq!(moved, vec!["big.bin"]);
        assert!(!f.vfs.exists(&vp("/a/big.bin")).await.unwrap());
        assert_eq!(f.vfs.get_size(&vp("/b/big.bin")).await.unwrap(), 80);
    }

    #[tokio::test]
    async fn test_same_mount_move_skips_capacity() {
        let f = fixture(&[("a", 100)]).await;
        write(&f.vfs, "/a/full.bin", 100).await;
        f.vfs.make_dirs(&vp("/a/sub")).await.unwrap();

        f.vfs
            .move_path(&vp("/a/full.bin"), &vp("/a/sub/full.bin"), false)
            .await
            .unwrap();
        assert_eq!(f.vfs.get_size(&vp("/a/sub/full.bin")).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_same_mount_copy_counts_batch_once() {
        let f = fixture(&[("a", 100)]).await;
        write(&f.vfs, "/a/half.bin", 50).await;
        f.vfs.make_dirs(&vp("/a/sub")).await.unwrap();

        // 50 used + 50 copied fits exactly.
        let copied = f
            .vfs
            .copy_entries(&vp("/a"), &vp("/a/sub"), &["half.bin".to_string()])
            .await
            .unwrap();
        assert_eq!(copied, vec!["half.bin"]);

        let err = f
            .vfs
            .copy_path(&vp("/a/half.bin"), &vp("/a/again.bin"), false)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InsufficientCapacity);
    }

    #[tokio::test]
    async fn test_batch_skips_missing_and_existing_names() {
        let f = fixture(&[("a", 1000), ("b", 1000)]).await;
        write(&f.vfs, "/a/new.txt", 3).await;
        write(&f.vfs, "/a/dup.txt", 3).await;
        write(&f.vfs, "/b/dup.txt", 5).await;

        let names = vec!["new.txt".into(), "dup.txt".into(), "ghost.txt".into()];
        let copied = f
            .vfs
            .copy_entries(&vp("/a"), &vp("/b"), &names)
            .await
            .unwrap();
        assert_eq!(copied, vec!["new.txt"]);
        assert_eq!(f.vfs.get_size(&vp("/b/dup.txt")).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_destination() {
        let f = fixture(&[("a", 1000), ("b", 1000)]).await;
        write(&f.vfs, "/a/f.txt", 3).await;
        write(&f.vfs, "/b/f.txt", 9).await;

        let err = f
            .vfs
            .copy_path(&vp("/a/f.txt"), &vp("/b/f.txt"), false)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateName);

        f.vfs
            .move_path(&vp("/a/f.txt"), &vp("/b/f.txt"), true)
            .await
            .unwrap();
        assert_eq!(f.vfs.get_size(&vp("/b/f.txt")).await.unwrap(), 3);
        assert!(!f.vfs.exists(&vp("/a/f.txt")).await.unwrap());
    }

    #[tokio::test]
    async fn test_search_and_recursive_listing() {
        let f = fixture(&[("a", 1000)]).await;
        write(&f.vfs, "/a/x/report.pdf", 1).await;
        write(&f.vfs, "/a/y/report.pdf", 1).await;
        f.vfs.make_dirs(&vp("/a/z/report.pdf")).await.unwrap();

        let files = f.vfs.search(&vp("/a"), "report.pdf", false).await.unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|e| !e.is_dir));
        let dirs = f.vfs.search(&vp("/a"), "report.pdf", true).await.unwrap();
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].path, vp("/a/z/report.pdf"));

        let all_files = f.vfs.list_recursive(&vp("/a")).await.unwrap();
        assert_eq!(all_files.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_empty_dirs_is_bottom_up() {
        let f = fixture(&[("a", 1000)]).await;
        f.vfs.make_dirs(&vp("/a/e1/e2/e3")).await.unwrap();
        write(&f.vfs, "/a/keep/file.txt", 1).await;

        let removed = f.vfs.clear_empty_dirs(&vp("/a")).await.unwrap();
        assert_eq!(removed, 3);
        assert!(!f.vfs.exists(&vp("/a/e1")).await.unwrap());
        assert!(f.vfs.exists(&vp("/a/keep/file.txt")).await.unwrap());
    }

    #[tokio::test]
    async fn test_detail_aggregates_directory_size() {
        let f = fixture(&[("a", 1000)]).await;
        write(&f.vfs, "/a/d/one.bin", 4).await;
        write(&f.vfs, "/a/d/deeper/two.bin", 6).await;
        write(&f.vfs, "/a/top.bin", 1).await;

        let detail = f.vfs.detail(&vp("/a/d")).await.unwrap();
        assert!(detail.is_dir);
        assert_eq!(detail.size, 10);
        assert_eq!(detail.parent, vp("/a"));

        let dirs = f.vfs.list_dirs(&vp("/a")).await.unwrap();
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].name, "d");
    }

    #[tokio::test]
    async fn test_unknown_mount_is_path_not_found() {
        let f = fixture(&[("a", 1000)]).await;
        let err = f.vfs.list(&vp("/nope")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::PathNotFound);
        assert!(!f.vfs.exists(&vp("/nope/x")).await.unwrap());
    }
}
