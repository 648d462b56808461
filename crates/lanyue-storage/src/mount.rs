//! Mount table: routes the first segment of a virtual path to a backend.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use lanyue_core::error::AppError;
use lanyue_core::result::AppResult;
use lanyue_core::traits::storage::StorageBackend;
use lanyue_core::types::VirtualPath;
use lanyue_entity::storage::OrderField;

/// One live mount.
#[derive(Debug, Clone)]
pub struct MountPoint {
    /// First path segment routed to this mount.
    pub name: String,
    pub backend: Arc<dyn StorageBackend>,
    /// Byte quota enforced on uploads and transfers into this mount.
    pub capacity: u64,
    /// Field listings of this mount are ordered by.
    pub order_field: OrderField,
    /// Whether listings are reversed.
    pub reverse: bool,
}

/// Shared registry of live mounts.
///
/// Mutations are serialized behind one write lock and validated before
/// anything changes, so a failed mount or unmount leaves every other
/// entry untouched.
#[derive(Debug, Clone, Default)]
pub struct MountTable {
    mounts: Arc<RwLock<BTreeMap<String, MountPoint>>>,
}

impl MountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mount. Fails if the name is already mounted.
    pub async fn mount(&self, point: MountPoint) -> AppResult<()> {
        let mut mounts = self.mounts.write().await;
        if mounts.contains_key(&point.name) {
            return Err(AppError::duplicate_mount(&point.name));
        }
        info!(
            mount = %point.name,
            backend = point.backend.backend_type(),
            capacity = point.capacity,
            "Mounted storage"
        );
        mounts.insert(point.name.clone(), point);
        Ok(())
    }

    /// Remove a mount from the table. Files on the backend are untouched.
    pub async fn unmount(&self, name: &str) -> AppResult<MountPoint> {
        let removed = self
            .mounts
            .write()
            .await
            .remove(name)
            .ok_or_else(|| AppError::not_mounted(name))?;
        info!(mount = name, "Unmounted storage");
        Ok(removed)
    }

    /// Swap the mount `old_name` for `point` in one step, as done after a
    /// storage is renamed or moved to a new root.
    pub async fn remount(&self, old_name: &str, point: MountPoint) -> AppResult<()> {
        let mut mounts = self.mounts.write().await;
        if !mounts.contains_key(old_name) {
            return Err(AppError::not_mounted(old_name));
        }
        if point.name != old_name && mounts.contains_key(&point.name) {
            return Err(AppError::duplicate_mount(&point.name));
        }
        mounts.remove(old_name);
        info!(from = old_name, to = %point.name, "Remounted storage");
        mounts.insert(point.name.clone(), point);
        Ok(())
    }

    pub async fn is_mounted(&self, name: &str) -> bool {
        self.mounts.read().await.contains_key(name)
    }

    /// Look up a mount by name.
    pub async fn get(&self, name: &str) -> AppResult<MountPoint> {
        self.mounts
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::path_not_found(format!("/{name}")))
    }

    /// Every live mount, by name.
    pub async fn list(&self) -> Vec<MountPoint> {
        self.mounts.read().await.values().cloned().collect()
    }

    /// Split a virtual path into its mount and the path inside the backend.
    pub async fn resolve(&self, path: &VirtualPath) -> AppResult<(MountPoint, String)> {
        let name = path
            .mount_name()
            .ok_or_else(|| AppError::path_not_found(path))?;
        let point = self
            .mounts
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::path_not_found(path))?;
        Ok((point, path.sub_path()))
    }

    /// Total file bytes and file count below a virtual directory. The root
    /// aggregates every mount.
    pub async fn dir_size(&self, path: &VirtualPath) -> AppResult<(u64, u64)> {
        if path.is_root() {
            let mut total = (0, 0);
            for point in self.list().await {
                let (bytes, files) = point.backend.dir_size("").await?;
                total = (total.0 + bytes, total.1 + files);
            }
            return Ok(total);
        }
        let (point, sub_path) = self.resolve(path).await?;
        point.backend.dir_size(&sub_path).await
    }
}

#[cfg(test)]
mod tests {
    use lanyue_core::error::ErrorKind;

    use super::*;
    use crate::providers::local::LocalBackend;

    async fn point(name: &str, root: &std::path::Path) -> MountPoint {
        MountPoint {
            name: name.to_string(),
            backend: Arc::new(LocalBackend::new(root).await.unwrap()),
            capacity: 1000,
            order_field: OrderField::Name,
            reverse: false,
        }
    }

    #[tokio::test]
    async fn test_mount_resolve_unmount() {
        let dir = tempfile::tempdir().unwrap();
        let table = MountTable::new();
        table.mount(point("docs", dir.path()).await).await.unwrap();

        let err = table
            .mount(point("docs", dir.path()).await)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateMount);

        let path = VirtualPath::parse("/docs/a/b.txt").unwrap();
        let (mount, sub) = table.resolve(&path).await.unwrap();
        assert_eq!(mount.name, "docs");
        assert_eq!(sub, "a/b.txt");

        table.unmount("docs").await.unwrap();
        assert!(dir.path().exists());
        let err = table.resolve(&path).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::PathNotFound);
        let err = table.unmount("docs").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotMounted);
    }

    #[tokio::test]
    async fn test_failed_remount_keeps_table() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let table = MountTable::new();
        table.mount(point("a", a.path()).await).await.unwrap();
        table.mount(point("b", b.path()).await).await.unwrap();

        let err = table
            .remount("a", point("b", a.path()).await)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateMount);
        assert!(table.is_mounted("a").await);
        assert!(table.is_mounted("b").await);

        table.remount("a", point("c", a.path()).await).await.unwrap();
        assert!(!table.is_mounted("a").await);
        assert!(table.is_mounted("c").await);
    }

    #[tokio::test]
    async fn test_dir_size_counts_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sub/deeper")).unwrap();
        std::fs::write(dir.path().join("sub/a.bin"), vec![1u8; 10]).unwrap();
        std::fs::write(dir.path().join("sub/deeper/b.bin"), vec![1u8; 5]).unwrap();

        let table = MountTable::new();
        table.mount(point("docs", dir.path()).await).await.unwrap();

        let sub = VirtualPath::parse("/docs/sub").unwrap();
        assert_eq!(table.dir_size(&sub).await.unwrap(), (15, 2));
        assert_eq!(table.dir_size(&VirtualPath::root()).await.unwrap(), (15, 2));
    }
}
