//! PostgreSQL upload task repository.

use async_trait::async_trait;
use sqlx::PgPool;

use lanyue_core::result::AppResult;
use lanyue_entity::upload::{ChunkInfo, NewUploadTask, UploadStatus, UploadTask};

use super::{UploadTaskRepository, map_sqlx_error};

/// Upload sessions in the `upload_tasks` table.
#[derive(Debug, Clone)]
pub struct PgUploadTaskRepository {
    pool: PgPool,
}

impl PgUploadTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UploadTaskRepository for PgUploadTaskRepository {
    async fn find_by_session_id(&self, session_id: &str) -> AppResult<Option<UploadTask>> {
        sqlx::query_as::<_, UploadTask>("SELECT * FROM upload_tasks WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to find upload task"))
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<UploadTask>> {
        sqlx::query_as::<_, UploadTask>("SELECT * FROM upload_tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to find upload task"))
    }

    async fn find_all(&self) -> AppResult<Vec<UploadTask>> {
        sqlx::query_as::<_, UploadTask>("SELECT * FROM upload_tasks ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to list upload tasks"))
    }

    async fn find_by_status(&self, status: UploadStatus) -> AppResult<Vec<UploadTask>> {
        sqlx::query_as::<_, UploadTask>(
            "SELECT * FROM upload_tasks WHERE status = $1 ORDER BY id ASC",
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to list upload tasks by status"))
    }

    async fn create(&self, data: &NewUploadTask) -> AppResult<UploadTask> {
        let chunk = data.chunk_info;
        sqlx::query_as::<_, UploadTask>(
            "INSERT INTO upload_tasks \
             (session_id, path, web_path, name, size, modified, mime_type, status, mode, overwrite, \
              chunk_size, chunk_total, chunk_cur) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'uploading', $8, $9, $10, $11, $12) RETURNING *",
        )
        .bind(&data.session_id)
        .bind(&data.path)
        .bind(&data.web_path)
        .bind(&data.name)
        .bind(data.size)
        .bind(data.modified)
        .bind(&data.mime_type)
        .bind(data.mode)
        .bind(data.overwrite)
        .bind(chunk.map(|c| c.chunk_size as i64))
        .bind(chunk.map(|c| c.chunk_total as i64))
        .bind(chunk.map(|c| c.chunk_cur as i64))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to create upload task"))
    }

    async fn update_status(&self, session_id: &str, status: UploadStatus) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE upload_tasks SET status = $2, updated_at = NOW() WHERE session_id = $1",
        )
        .bind(session_id)
        .bind(status)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to update upload status"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_progress(
        &self,
        session_id: &str,
        status: UploadStatus,
        chunk_info: Option<ChunkInfo>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE upload_tasks SET status = $2, chunk_size = $3, chunk_total = $4, chunk_cur = $5, \
             updated_at = NOW() WHERE session_id = $1",
        )
        .bind(session_id)
        .bind(status)
        .bind(chunk_info.map(|c| c.chunk_size as i64))
        .bind(chunk_info.map(|c| c.chunk_total as i64))
        .bind(chunk_info.map(|c| c.chunk_cur as i64))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to update upload progress"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_session_id(&self, session_id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM upload_tasks WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to delete upload task"))?;
        Ok(result.rows_affected() > 0)
    }
}
