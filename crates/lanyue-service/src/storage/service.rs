//! Storage mount management.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use lanyue_core::error::AppError;
use lanyue_core::result::AppResult;
use lanyue_core::traits::storage::StorageBackend;
use lanyue_database::StorageRepository;
use lanyue_entity::storage::{CreateStorage, OrderField, StorageMount, UpdateStorage};
use lanyue_storage::{LocalBackend, MountPoint, MountTable};

use crate::context::RequestContext;

/// A storage record with the live usage of its mount.
#[derive(Debug, Clone, Serialize)]
pub struct StorageSummary {
    #[serde(flatten)]
    pub storage: StorageMount,
    /// Bytes in use below the mount root; 0 while inactive.
    pub space_size: u64,
}

/// Keeps storage records and the mount table in step.
#[derive(Debug, Clone)]
pub struct StorageService {
    storages: Arc<dyn StorageRepository>,
    mounts: MountTable,
}

fn validate_mount_name(name: &str) -> AppResult<()> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(AppError::validation(format!("Invalid mount name: '{name}'")));
    }
    Ok(())
}

impl StorageService {
    pub fn new(storages: Arc<dyn StorageRepository>, mounts: MountTable) -> Self {
        Self { storages, mounts }
    }

    async fn find(&self, id: i64) -> AppResult<StorageMount> {
        self.storages
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Storage {id} not found")))
    }

    /// Open the root of a storage and check that its current contents fit
    /// into `capacity`.
    async fn open_root(&self, root_path: &str, capacity: i64) -> AppResult<LocalBackend> {
        if capacity < 0 {
            return Err(AppError::validation("Capacity cannot be negative"));
        }
        let backend = LocalBackend::new(root_path).await?;
        let (used, _) = backend.dir_size("").await?;
        if used > capacity as u64 {
            return Err(AppError::capacity_exceeded(format!(
                "Directory '{root_path}' already holds {used} bytes, more than the capacity of {capacity}"
            )));
        }
        Ok(backend)
    }

    fn point(record: &StorageMount, backend: LocalBackend) -> MountPoint {
        MountPoint {
            name: record.mount_name.clone(),
            backend: Arc::new(backend),
            capacity: record.capacity_bytes(),
            order_field: record.order_field,
            reverse: record.reverse,
        }
    }

    async fn summarize(&self, storage: StorageMount) -> AppResult<StorageSummary> {
        let space_size = if storage.activated && self.mounts.is_mounted(&storage.mount_name).await {
            self.mounts.get(&storage.mount_name).await?.backend.dir_size("").await?.0
        } else {
            0
        };
        Ok(StorageSummary {
            storage,
            space_size,
        })
    }

    /// Every field listings can be ordered by.
    pub fn order_fields(&self) -> Vec<OrderField> {
        OrderField::ALL.to_vec()
    }

    /// Register a storage, creating its root directory when missing, and
    /// mount it right away when it is active.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        data: CreateStorage,
    ) -> AppResult<StorageMount> {
        ctx.require_admin()?;
        validate_mount_name(&data.mount_name)?;
        if self
            .storages
            .find_by_mount_name(&data.mount_name)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(format!(
                "Mount name already exists: {}",
                data.mount_name
            )));
        }
        let backend = self.open_root(&data.root_path, data.capacity).await?;

        let record = self.storages.create(&data).await?;
        if record.activated {
            self.mounts.mount(Self::point(&record, backend)).await?;
        }
        info!(
            user = %ctx.username,
            storage_id = record.id,
            mount = %record.mount_name,
            root = %record.root_path,
            "Storage created"
        );
        Ok(record)
    }

    /// Every storage ordered by its sort key, with live usage.
    pub async fn list(&self, ctx: &RequestContext) -> AppResult<Vec<StorageSummary>> {
        ctx.require_admin()?;
        let mut summaries = Vec::new();
        for storage in self.storages.find_all().await? {
            summaries.push(self.summarize(storage).await?);
        }
        Ok(summaries)
    }

    pub async fn info(&self, ctx: &RequestContext, id: i64) -> AppResult<StorageSummary> {
        ctx.require_admin()?;
        let storage = self.find(id).await?;
        self.summarize(storage).await
    }

    /// Change a storage's name, root, capacity or ordering. An active
    /// storage is remounted under its new settings.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: i64,
        data: UpdateStorage,
    ) -> AppResult<StorageMount> {
        ctx.require_admin()?;
        validate_mount_name(&data.mount_name)?;
        let current = self.find(id).await?;
        if let Some(other) = self.storages.find_by_mount_name(&data.mount_name).await? {
            if other.id != id {
                return Err(AppError::conflict(format!(
                    "Mount name already exists: {}",
                    data.mount_name
                )));
            }
        }
        if !tokio::fs::metadata(&data.root_path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(AppError::validation(format!(
                "Directory does not exist: {}",
                data.root_path
            )));
        }
        let backend = self.open_root(&data.root_path, data.capacity).await?;

        let updated = self
            .storages
            .update(id, &data)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Storage {id} not found")))?;

        if current.activated {
            let point = Self::point(&updated, backend);
            if self.mounts.is_mounted(&current.mount_name).await {
                self.mounts.remount(&current.mount_name, point).await?;
            } else {
                self.mounts.mount(point).await?;
            }
        }
        info!(
            user = %ctx.username,
            storage_id = id,
            mount = %updated.mount_name,
            "Storage updated"
        );
        Ok(updated)
    }

    /// Activate a storage and mount it.
    pub async fn enable(&self, ctx: &RequestContext, id: i64) -> AppResult<StorageMount> {
        ctx.require_admin()?;
        let mut storage = self.find(id).await?;
        if !self.mounts.is_mounted(&storage.mount_name).await {
            let backend = LocalBackend::new(&storage.root_path).await?;
            self.mounts.mount(Self::point(&storage, backend)).await?;
        }
        self.storages.set_activated(id, true).await?;
        storage.activated = true;
        info!(user = %ctx.username, mount = %storage.mount_name, "Storage enabled");
        Ok(storage)
    }

    /// Deactivate a storage. Its files stay on disk.
    pub async fn disable(&self, ctx: &RequestContext, id: i64) -> AppResult<StorageMount> {
        ctx.require_admin()?;
        let mut storage = self.find(id).await?;
        self.storages.set_activated(id, false).await?;
        if self.mounts.is_mounted(&storage.mount_name).await {
            self.mounts.unmount(&storage.mount_name).await?;
        }
        storage.activated = false;
        info!(user = %ctx.username, mount = %storage.mount_name, "Storage disabled");
        Ok(storage)
    }

    /// Unmount a storage and drop its record. Returns whether a record
    /// existed.
    pub async fn delete(&self, ctx: &RequestContext, id: i64) -> AppResult<bool> {
        ctx.require_admin()?;
        let Some(storage) = self.storages.find_by_id(id).await? else {
            return Ok(false);
        };
        if self.mounts.is_mounted(&storage.mount_name).await {
            self.mounts.unmount(&storage.mount_name).await?;
        }
        let deleted = self.storages.delete(id).await?;
        info!(user = %ctx.username, mount = %storage.mount_name, "Storage deleted");
        Ok(deleted)
    }

    /// Mount every active storage at startup. Storages that fail to mount
    /// are logged and skipped. Returns how many were mounted.
    pub async fn restore_mounts(&self) -> AppResult<usize> {
        let mut mounted = 0;
        for storage in self.storages.find_active().await? {
            let result = match LocalBackend::new(&storage.root_path).await {
                Ok(backend) => self.mounts.mount(Self::point(&storage, backend)).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => mounted += 1,
                Err(e) => warn!(mount = %storage.mount_name, error = %e, "Failed to restore mount"),
            }
        }
        info!(mounted, "Restored storage mounts");
        Ok(mounted)
    }
}
