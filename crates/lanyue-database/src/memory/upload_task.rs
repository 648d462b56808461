use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use lanyue_core::error::AppError;
use lanyue_core::result::AppResult;
use lanyue_entity::upload::{ChunkInfo, NewUploadTask, UploadStatus, UploadTask};

use crate::repositories::UploadTaskRepository;

#[derive(Debug, Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, UploadTask>,
}

impl Table {
    fn by_session_mut(&mut self, session_id: &str) -> Option<&mut UploadTask> {
        self.rows.values_mut().find(|t| t.session_id == session_id)
    }
}

/// Upload sessions held in process memory.
#[derive(Debug, Default)]
pub struct MemoryUploadTaskRepository {
    table: RwLock<Table>,
}

impl MemoryUploadTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UploadTaskRepository for MemoryUploadTaskRepository {
    async fn find_by_session_id(&self, session_id: &str) -> AppResult<Option<UploadTask>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .find(|t| t.session_id == session_id)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<UploadTask>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn find_all(&self) -> AppResult<Vec<UploadTask>> {
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn find_by_status(&self, status: UploadStatus) -> AppResult<Vec<UploadTask>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .filter(|t| t.status == status)
            .cloned()
            .collect())
    }

    async fn create(&self, data: &NewUploadTask) -> AppResult<UploadTask> {
        let mut table = self.table.write().await;
        if table.by_session_mut(&data.session_id).is_some() {
            return Err(AppError::conflict(format!(
                "Upload task {} already exists",
                data.session_id
            )));
        }
        table.next_id += 1;
        let now = Utc::now();
        let mut task = UploadTask {
            id: table.next_id,
            session_id: data.session_id.clone(),
            path: data.path.clone(),
            web_path: data.web_path.clone(),
            name: data.name.clone(),
            size: data.size,
            modified: data.modified,
            mime_type: data.mime_type.clone(),
            status: UploadStatus::Uploading,
            mode: data.mode,
            overwrite: data.overwrite,
            chunk_size: None,
            chunk_total: None,
            chunk_cur: None,
            created_at: now,
            updated_at: now,
        };
        task.set_chunk_info(data.chunk_info);
        table.rows.insert(task.id, task.clone());
        Ok(task)
    }

    async fn update_status(&self, session_id: &str, status: UploadStatus) -> AppResult<bool> {
        let mut table = self.table.write().await;
        match table.by_session_mut(session_id) {
            Some(task) => {
                task.status = status;
                task.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_progress(
        &self,
        session_id: &str,
        status: UploadStatus,
        chunk_info: Option<ChunkInfo>,
    ) -> AppResult<bool> {
        let mut table = self.table.write().await;
        match table.by_session_mut(session_id) {
            Some(task) => {
                task.status = status;
                task.set_chunk_info(chunk_info);
                task.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_by_session_id(&self, session_id: &str) -> AppResult<bool> {
        let mut table = self.table.write().await;
        let id = table
            .rows
            .values()
            .find(|t| t.session_id == session_id)
            .map(|t| t.id);
        Ok(id.and_then(|id| table.rows.remove(&id)).is_some())
    }
}

#[cfg(test)]
mod tests {
    use lanyue_core::error::ErrorKind;
    use lanyue_entity::upload::UploadMode;

    use super::*;

    fn new_task(session_id: &str) -> NewUploadTask {
        NewUploadTask {
            session_id: session_id.to_string(),
            path: "/docs".to_string(),
            web_path: "/a.txt".to_string(),
            name: "a.txt".to_string(),
            size: 25,
            modified: 1_700_000_000_000,
            mime_type: "text/plain".to_string(),
            mode: UploadMode::Chunk,
            overwrite: false,
            chunk_info: Some(ChunkInfo::layout(25, 10)),
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup_both_keys() {
        let repo = MemoryUploadTaskRepository::new();
        let task = repo.create(&new_task("s1")).await.unwrap();
        assert_eq!(task.id, 1);
        assert_eq!(task.status, UploadStatus::Uploading);
        assert_eq!(task.chunk_info().unwrap().chunk_total, 3);

        assert!(repo.find_by_id(1).await.unwrap().is_some());
        assert!(repo.find_by_session_id("s1").await.unwrap().is_some());
        let err = repo.create(&new_task("s1")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_progress_and_status_filter() {
        let repo = MemoryUploadTaskRepository::new();
        repo.create(&new_task("s1")).await.unwrap();
        repo.create(&new_task("s2")).await.unwrap();

        let mut info = ChunkInfo::layout(25, 10);
        info.chunk_cur = 1;
        assert!(
            repo.update_progress("s1", UploadStatus::Failed, Some(info))
                .await
                .unwrap()
        );
        let failed = repo.find_by_status(UploadStatus::Failed).await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].chunk_info().unwrap().chunk_cur, 1);

        assert!(repo.delete_by_session_id("s1").await.unwrap());
        assert!(!repo.delete_by_session_id("s1").await.unwrap());
        assert_eq!(repo.find_all().await.unwrap().len(), 1);
    }
}
