use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use lanyue_core::error::AppError;
use lanyue_core::result::AppResult;
use lanyue_entity::storage::{CreateStorage, StorageMount, UpdateStorage};

use crate::repositories::StorageRepository;

#[derive(Debug, Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, StorageMount>,
}

/// Storage records held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStorageRepository {
    table: RwLock<Table>,
}

impl MemoryStorageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn ordered(mut rows: Vec<StorageMount>) -> Vec<StorageMount> {
    rows.sort_by_key(|s| (s.sort_order, s.id));
    rows
}

fn name_taken(table: &Table, mount_name: &str, except: Option<i64>) -> bool {
    table
        .rows
        .values()
        .any(|s| s.mount_name == mount_name && Some(s.id) != except)
}

#[async_trait]
impl StorageRepository for MemoryStorageRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<StorageMount>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn find_by_mount_name(&self, mount_name: &str) -> AppResult<Option<StorageMount>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .find(|s| s.mount_name == mount_name)
            .cloned())
    }

    async fn find_all(&self) -> AppResult<Vec<StorageMount>> {
        let table = self.table.read().await;
        Ok(ordered(table.rows.values().cloned().collect()))
    }

    async fn find_active(&self) -> AppResult<Vec<StorageMount>> {
        let table = self.table.read().await;
        Ok(ordered(
            table.rows.values().filter(|s| s.activated).cloned().collect(),
        ))
    }

    async fn create(&self, data: &CreateStorage) -> AppResult<StorageMount> {
        let mut table = self.table.write().await;
        if name_taken(&table, &data.mount_name, None) {
            return Err(AppError::conflict(format!(
                "Storage '{}' already exists",
                data.mount_name
            )));
        }
        table.next_id += 1;
        let now = Utc::now();
        let storage = StorageMount {
            id: table.next_id,
            mount_name: data.mount_name.clone(),
            root_path: data.root_path.clone(),
            sort_order: data.sort_order,
            order_field: data.order_field,
            reverse: data.reverse,
            capacity: data.capacity,
            activated: data.activated,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(storage.id, storage.clone());
        Ok(storage)
    }

    async fn update(&self, id: i64, data: &UpdateStorage) -> AppResult<Option<StorageMount>> {
        let mut table = self.table.write().await;
        if name_taken(&table, &data.mount_name, Some(id)) {
            return Err(AppError::conflict(format!(
                "Storage '{}' already exists",
                data.mount_name
            )));
        }
        let Some(storage) = table.rows.get_mut(&id) else {
            return Ok(None);
        };
        storage.mount_name = data.mount_name.clone();
        storage.root_path = data.root_path.clone();
        storage.sort_order = data.sort_order;
        storage.order_field = data.order_field;
        storage.reverse = data.reverse;
        storage.capacity = data.capacity;
        storage.updated_at = Utc::now();
        Ok(Some(storage.clone()))
    }

    async fn set_activated(&self, id: i64, activated: bool) -> AppResult<bool> {
        let mut table = self.table.write().await;
        match table.rows.get_mut(&id) {
            Some(storage) => {
                storage.activated = activated;
                storage.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        Ok(self.table.write().await.rows.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use lanyue_core::error::ErrorKind;
    use lanyue_entity::storage::OrderField;

    use super::*;

    fn new_storage(name: &str, sort_order: i32) -> CreateStorage {
        CreateStorage {
            mount_name: name.to_string(),
            root_path: format!("/srv/{name}"),
            sort_order,
            order_field: OrderField::Name,
            reverse: false,
            capacity: 1000,
            activated: true,
        }
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_name() {
        let repo = MemoryStorageRepository::new();
        repo.create(&new_storage("docs", 0)).await.unwrap();
        let err = repo.create(&new_storage("docs", 1)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_find_all_is_ordered_and_active_filters() {
        let repo = MemoryStorageRepository::new();
        let b = repo.create(&new_storage("b", 2)).await.unwrap();
        repo.create(&new_storage("a", 1)).await.unwrap();
        repo.set_activated(b.id, false).await.unwrap();

        let names: Vec<_> = repo
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.mount_name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(repo.find_active().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_allows_own_name() {
        let repo = MemoryStorageRepository::new();
        let docs = repo.create(&new_storage("docs", 0)).await.unwrap();
        let update = UpdateStorage {
            mount_name: "docs".to_string(),
            root_path: docs.root_path.clone(),
            sort_order: 3,
            order_field: OrderField::Size,
            reverse: true,
            capacity: 2000,
        };
        let updated = repo.update(docs.id, &update).await.unwrap().unwrap();
        assert_eq!(updated.capacity, 2000);
        assert_eq!(updated.order_field, OrderField::Size);
        assert!(repo.update(99, &update).await.unwrap().is_none());
    }
}
