//! PostgreSQL storage repository.

use async_trait::async_trait;
use sqlx::PgPool;

use lanyue_core::result::AppResult;
use lanyue_entity::storage::{CreateStorage, StorageMount, UpdateStorage};

use super::{StorageRepository, map_sqlx_error};

/// Storage mount records in the `storages` table.
#[derive(Debug, Clone)]
pub struct PgStorageRepository {
    pool: PgPool,
}

impl PgStorageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StorageRepository for PgStorageRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<StorageMount>> {
        sqlx::query_as::<_, StorageMount>("SELECT * FROM storages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to find storage"))
    }

    async fn find_by_mount_name(&self, mount_name: &str) -> AppResult<Option<StorageMount>> {
        sqlx::query_as::<_, StorageMount>("SELECT * FROM storages WHERE mount_name = $1")
            .bind(mount_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to find storage by mount name"))
    }

    async fn find_all(&self) -> AppResult<Vec<StorageMount>> {
        sqlx::query_as::<_, StorageMount>("SELECT * FROM storages ORDER BY sort_order ASC, id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to list storages"))
    }

    async fn find_active(&self) -> AppResult<Vec<StorageMount>> {
        sqlx::query_as::<_, StorageMount>(
            "SELECT * FROM storages WHERE activated = TRUE ORDER BY sort_order ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to list active storages"))
    }

    async fn create(&self, data: &CreateStorage) -> AppResult<StorageMount> {
        sqlx::query_as::<_, StorageMount>(
            "INSERT INTO storages (mount_name, root_path, sort_order, order_field, reverse, capacity, activated) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(&data.mount_name)
        .bind(&data.root_path)
        .bind(data.sort_order)
        .bind(data.order_field)
        .bind(data.reverse)
        .bind(data.capacity)
        .bind(data.activated)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to create storage"))
    }

    async fn update(&self, id: i64, data: &UpdateStorage) -> AppResult<Option<StorageMount>> {
        sqlx::query_as::<_, StorageMount>(
            "UPDATE storages SET mount_name = $2, root_path = $3, sort_order = $4, order_field = $5, \
             reverse = $6, capacity = $7, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&data.mount_name)
        .bind(&data.root_path)
        .bind(data.sort_order)
        .bind(data.order_field)
        .bind(data.reverse)
        .bind(data.capacity)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to update storage"))
    }

    async fn set_activated(&self, id: i64, activated: bool) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE storages SET activated = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(activated)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to update storage activation"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM storages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to delete storage"))?;
        Ok(result.rows_affected() > 0)
    }
}
