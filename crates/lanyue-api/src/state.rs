//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use lanyue_cache::CacheManager;
use lanyue_core::config::AppConfig;
use lanyue_core::result::AppResult;
use lanyue_database::Repositories;
use lanyue_service::upload::CancellationChannel;
use lanyue_service::{DownloadService, FileService, StorageService, UploadService};
use lanyue_storage::thumbnail::ThumbnailGenerator;
use lanyue_storage::{MountTable, Vfs};

use crate::auth::JwtVerifier;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`. The mount table and
/// the services are built once at startup and shared by reference.
#[derive(Debug, Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    pub config: Arc<AppConfig>,
    pub started_at: Instant,

    // ── Infrastructure ───────────────────────────────────────
    /// Record store (PostgreSQL or in-memory)
    pub repositories: Repositories,
    /// Ephemeral store (Redis or in-memory)
    pub cache: CacheManager,
    /// Live mounts of the virtual namespace
    pub mounts: MountTable,
    pub thumbnails: ThumbnailGenerator,

    // ── Auth ─────────────────────────────────────────────────
    pub jwt: Arc<JwtVerifier>,

    // ── Services ─────────────────────────────────────────────
    pub upload_service: Arc<UploadService>,
    pub storage_service: Arc<StorageService>,
    pub file_service: Arc<FileService>,
    pub download_service: Arc<DownloadService>,
}

impl AppState {
    /// Wire the services over the given stores and mount every activated
    /// storage.
    pub async fn build(
        config: AppConfig,
        repositories: Repositories,
        cache: CacheManager,
    ) -> AppResult<Self> {
        let mounts = MountTable::new();
        let vfs = Vfs::new(mounts.clone());
        let thumbnails = ThumbnailGenerator::new(&config.preview);

        let storage_service = Arc::new(StorageService::new(
            Arc::clone(&repositories.storages),
            mounts.clone(),
        ));
        let upload_service = Arc::new(UploadService::new(
            Arc::clone(&repositories.upload_tasks),
            vfs.clone(),
            CancellationChannel::new(cache.clone()),
            Arc::new(thumbnails.clone()),
            config.fs.clone(),
        ));
        let file_service = Arc::new(FileService::new(
            vfs.clone(),
            thumbnails.clone(),
            config.fs.clone(),
        ));
        let download_service = Arc::new(DownloadService::new(vfs, config.fs.clone()));

        let mounted = storage_service.restore_mounts().await?;
        info!(mounted, "Storage mounts restored");

        Ok(Self {
            jwt: Arc::new(JwtVerifier::new(&config.auth)),
            config: Arc::new(config),
            started_at: Instant::now(),
            repositories,
            cache,
            mounts,
            thumbnails,
            upload_service,
            storage_service,
            file_service,
            download_service,
        })
    }
}
