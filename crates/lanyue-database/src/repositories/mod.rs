//! Repository contracts and their PostgreSQL implementations.

pub mod storage;
pub mod upload_task;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use lanyue_core::config::database::DatabaseConfig;
use lanyue_core::result::AppResult;
use lanyue_entity::storage::{CreateStorage, StorageMount, UpdateStorage};
use lanyue_entity::upload::{ChunkInfo, NewUploadTask, UploadStatus, UploadTask};

use crate::memory::{MemoryStorageRepository, MemoryUploadTaskRepository};
use crate::postgres::PgRecordStore;

pub use storage::PgStorageRepository;
pub use upload_task::PgUploadTaskRepository;

/// Persistence of storage mount records.
#[async_trait]
pub trait StorageRepository: Send + Sync + std::fmt::Debug + 'static {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<StorageMount>>;

    async fn find_by_mount_name(&self, mount_name: &str) -> AppResult<Option<StorageMount>>;

    /// All records ordered by `sort_order`, then id.
    async fn find_all(&self) -> AppResult<Vec<StorageMount>>;

    /// Activated records ordered like [`StorageRepository::find_all`].
    async fn find_active(&self) -> AppResult<Vec<StorageMount>>;

    /// Insert a record. Fails with a conflict if the mount name is taken.
    async fn create(&self, data: &CreateStorage) -> AppResult<StorageMount>;

    /// Replace the editable fields. Returns `None` if the record is gone.
    async fn update(&self, id: i64, data: &UpdateStorage) -> AppResult<Option<StorageMount>>;

    async fn set_activated(&self, id: i64, activated: bool) -> AppResult<bool>;

    async fn delete(&self, id: i64) -> AppResult<bool>;
}

/// Persistence of upload sessions, keyed by session id and numeric id.
#[async_trait]
pub trait UploadTaskRepository: Send + Sync + std::fmt::Debug + 'static {
    async fn find_by_session_id(&self, session_id: &str) -> AppResult<Option<UploadTask>>;

    async fn find_by_id(&self, id: i64) -> AppResult<Option<UploadTask>>;

    /// Every session, oldest first.
    async fn find_all(&self) -> AppResult<Vec<UploadTask>>;

    async fn find_by_status(&self, status: UploadStatus) -> AppResult<Vec<UploadTask>>;

    /// Insert a session in the `Uploading` state. Fails with a conflict if
    /// the session id already exists.
    async fn create(&self, data: &NewUploadTask) -> AppResult<UploadTask>;

    async fn update_status(&self, session_id: &str, status: UploadStatus) -> AppResult<bool>;

    /// Persist a status together with the advanced chunk cursor.
    async fn update_progress(
        &self,
        session_id: &str,
        status: UploadStatus,
        chunk_info: Option<ChunkInfo>,
    ) -> AppResult<bool>;

    async fn delete_by_session_id(&self, session_id: &str) -> AppResult<bool>;
}

/// The repositories the services run on, behind trait objects.
#[derive(Debug, Clone)]
pub struct Repositories {
    pub storages: Arc<dyn StorageRepository>,
    pub upload_tasks: Arc<dyn UploadTaskRepository>,
    /// Store backing the PostgreSQL repositories, if any.
    pub postgres: Option<PgRecordStore>,
}

impl Repositories {
    /// Open the record store named by the configuration.
    ///
    /// `memory://` keeps everything in process; any other URL connects to
    /// PostgreSQL and applies pending migrations.
    pub async fn open(config: &DatabaseConfig) -> AppResult<Self> {
        if config.is_memory() {
            info!("Using in-memory record store");
            return Ok(Self::in_memory());
        }

        let store = PgRecordStore::open(config).await?;
        info!("Using PostgreSQL record store");
        Ok(Self {
            storages: Arc::new(store.storages()),
            upload_tasks: Arc::new(store.upload_tasks()),
            postgres: Some(store),
        })
    }

    /// Fresh, empty in-process repositories.
    pub fn in_memory() -> Self {
        Self {
            storages: Arc::new(MemoryStorageRepository::new()),
            upload_tasks: Arc::new(MemoryUploadTaskRepository::new()),
            postgres: None,
        }
    }

    /// Check that the record store is reachable.
    pub async fn health_check(&self) -> AppResult<bool> {
        match &self.postgres {
            Some(store) => store.ping().await,
            None => Ok(true),
        }
    }
}

/// Map a sqlx error, reporting unique violations as conflicts.
pub(crate) fn map_sqlx_error(err: sqlx::Error, message: &str) -> lanyue_core::AppError {
    use lanyue_core::error::{AppError, ErrorKind};

    let is_unique_violation = err
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if is_unique_violation {
        return AppError::with_source(
            ErrorKind::Conflict,
            format!("{message}: already exists"),
            err,
        );
    }
    AppError::with_source(ErrorKind::Database, message.to_string(), err)
}
