//! Upload controller: create or resume sessions and append their bytes.
//!
//! The destination file is the only record of progress. Every response
//! reports `uploaded` as the current length of that file, and the write
//! loop only appends the part of each incoming slice that lies beyond it,
//! so re-delivered bytes are harmless.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use lanyue_core::config::fs::FsConfig;
use lanyue_core::error::{AppError, ErrorKind};
use lanyue_core::result::AppResult;
use lanyue_core::types::VirtualPath;
use lanyue_database::UploadTaskRepository;
use lanyue_entity::upload::{ChunkInfo, NewUploadTask, UploadMode, UploadStatus, UploadTask};
use lanyue_storage::Vfs;
use lanyue_storage::thumbnail::ThumbnailScheduler;

use super::guard::WriterGuard;
use super::session_id::session_id;
use super::signal::CancellationChannel;
use crate::context::RequestContext;

/// Declared metadata of a new upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUpload {
    /// Virtual directory the file goes into.
    pub path: String,
    /// Path of the file relative to the folder the client selected. Any
    /// folders it names are recreated below `path`.
    pub web_path: String,
    pub name: String,
    pub size: u64,
    /// Client-side modification time.
    pub modified: i64,
    pub mime_type: String,
    pub mode: UploadMode,
    #[serde(default)]
    pub overwrite: bool,
}

/// A session together with the number of bytes already on disk.
#[derive(Debug, Clone, Serialize)]
pub struct UploadState {
    #[serde(flatten)]
    pub task: UploadTask,
    pub uploaded: u64,
}

enum LoopOutcome {
    Drained,
    Cancelled,
}

/// Orchestrates upload sessions over the record store, the cancellation
/// channel and the virtual filesystem.
#[derive(Clone)]
pub struct UploadService {
    tasks: Arc<dyn UploadTaskRepository>,
    vfs: Vfs,
    signals: CancellationChannel,
    writers: WriterGuard,
    thumbnails: Arc<dyn ThumbnailScheduler>,
    config: FsConfig,
}

impl std::fmt::Debug for UploadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadService").finish()
    }
}

impl UploadService {
    pub fn new(
        tasks: Arc<dyn UploadTaskRepository>,
        vfs: Vfs,
        signals: CancellationChannel,
        thumbnails: Arc<dyn ThumbnailScheduler>,
        config: FsConfig,
    ) -> Self {
        Self {
            tasks,
            vfs,
            signals,
            writers: WriterGuard::new(),
            thumbnails,
            config,
        }
    }

    async fn find(&self, session_id: &str) -> AppResult<UploadTask> {
        self.tasks
            .find_by_session_id(session_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Upload task not found: {session_id}")))
    }

    /// Current length of the session's destination file, 0 if absent.
    async fn uploaded(&self, task: &UploadTask) -> AppResult<u64> {
        let file = task.file_path()?;
        match self.vfs.file_size(&file).await {
            Ok(size) => Ok(size.unwrap_or(0)),
            Err(e) if e.is(ErrorKind::PathNotFound) => Ok(0),
            Err(e) => Err(e),
        }
    }

    async fn state(&self, task: UploadTask) -> AppResult<UploadState> {
        let uploaded = self.uploaded(&task).await?;
        Ok(UploadState { task, uploaded })
    }

    /// Create a session, or return the existing one for the same file.
    pub async fn create_or_resume(
        &self,
        ctx: &RequestContext,
        req: CreateUpload,
    ) -> AppResult<UploadState> {
        ctx.require_admin()?;
        if req.size > self.config.max_upload_size_bytes {
            return Err(AppError::capacity_exceeded(format!(
                "File size {} exceeds the upload limit of {} bytes",
                req.size, self.config.max_upload_size_bytes
            )));
        }
        if req.name.is_empty() || req.name.contains('/') || req.name == "." || req.name == ".." {
            return Err(AppError::validation(format!("Invalid file name: '{}'", req.name)));
        }
        let dir = VirtualPath::parse(&req.path)?;
        if dir.is_root() {
            return Err(AppError::validation("Uploads must target a storage"));
        }
        let (mount, _) = self.vfs.mounts().resolve(&dir).await?;

        let sid = session_id(&req.name, req.size, req.modified, &req.mime_type);
        let existing = self.tasks.find_by_session_id(&sid).await?;
        let already_on_disk = match &existing {
            Some(task) => self.uploaded(task).await?,
            None => 0,
        };

        let (used, _) = mount.backend.dir_size("").await?;
        let projected = used.saturating_sub(already_on_disk) + req.size;
        if projected > mount.capacity {
            return Err(AppError::capacity_exceeded(format!(
                "Storage '{}' cannot hold {} more bytes ({} of {} in use)",
                mount.name, req.size, used, mount.capacity
            )));
        }

        if let Some(task) = existing {
            debug!(session_id = %sid, uploaded = already_on_disk, "Resuming upload");
            return Ok(UploadState {
                task,
                uploaded: already_on_disk,
            });
        }

        let web = VirtualPath::parse(&format!("/{}", req.web_path.trim_start_matches('/')))?;
        let mut target_dir = dir;
        if web.segments() != [req.name.as_str()] {
            if web.file_name() != Some(req.name.as_str()) {
                return Err(AppError::validation(format!(
                    "Source path '{web}' does not end with '{}'",
                    req.name
                )));
            }
            let nested = web.segments()[..web.segments().len() - 1].join("/");
            target_dir = target_dir.join(&nested)?;
            self.vfs.make_dirs(&target_dir).await?;
        }

        let file = target_dir.join(&req.name)?;
        if !self.vfs.create_file(&file, req.overwrite).await? {
            return Err(AppError::duplicate_name(&req.name));
        }

        let chunk_info = match req.mode {
            UploadMode::Stream => None,
            UploadMode::Chunk => Some(ChunkInfo::layout(req.size, self.config.chunk_size_bytes)),
        };
        let task = self
            .tasks
            .create(&NewUploadTask {
                session_id: sid.clone(),
                path: target_dir.to_string(),
                web_path: web.to_string(),
                name: req.name,
                size: i64::try_from(req.size)
                    .map_err(|_| AppError::validation("Declared size is too large"))?,
                modified: req.modified,
                mime_type: req.mime_type,
                mode: req.mode,
                overwrite: req.overwrite,
                chunk_info,
            })
            .await?;

        info!(
            user = %ctx.username,
            session_id = %sid,
            file = %file,
            size = req.size,
            mode = %task.mode,
            "Upload task created"
        );
        Ok(UploadState { task, uploaded: 0 })
    }

    /// Append the body of a stream-mode session.
    pub async fn append_stream<S>(
        &self,
        ctx: &RequestContext,
        session_id: &str,
        body: S,
    ) -> AppResult<UploadState>
    where
        S: Stream<Item = Result<Bytes, io::Error>> + Send,
    {
        ctx.require_admin()?;
        let task = self.find(session_id).await?;
        if task.mode != UploadMode::Stream {
            return Err(AppError::mode_mismatch(
                "Upload mode does not match; delete the task and upload again",
            ));
        }
        self.append(task, None, body).await
    }

    /// Append chunk `chunk` of a chunk-mode session.
    pub async fn append_chunk<S>(
        &self,
        ctx: &RequestContext,
        session_id: &str,
        chunk: u64,
        body: S,
    ) -> AppResult<UploadState>
    where
        S: Stream<Item = Result<Bytes, io::Error>> + Send,
    {
        ctx.require_admin()?;
        let task = self.find(session_id).await?;
        let info = match (task.mode, task.chunk_info()) {
            (UploadMode::Chunk, Some(info)) => info,
            _ => {
                return Err(AppError::mode_mismatch(
                    "Upload mode does not match; delete the task and upload again",
                ));
            }
        };
        if info.is_complete() && chunk >= info.chunk_total {
            return self.state(task).await;
        }
        if chunk != info.chunk_cur {
            return Err(AppError::chunk_out_of_order(info.chunk_cur, chunk));
        }
        self.append(task, Some(info), body).await
    }

    async fn append<S>(
        &self,
        mut task: UploadTask,
        chunk: Option<ChunkInfo>,
        body: S,
    ) -> AppResult<UploadState>
    where
        S: Stream<Item = Result<Bytes, io::Error>> + Send,
    {
        let _permit = self.writers.try_acquire(&task.session_id)?;

        if task.status == UploadStatus::Failed {
            self.tasks
                .update_status(&task.session_id, UploadStatus::Uploading)
                .await?;
            task.status = UploadStatus::Uploading;
        }
        if task.status != UploadStatus::Uploading {
            return self.state(task).await;
        }

        self.signals.register(&task.session_id, task.id).await?;

        let read_from = chunk.map_or(0, |c| c.chunk_cur * c.chunk_size);
        match self.write_loop(&task, read_from, body).await {
            Ok(LoopOutcome::Cancelled) => {
                self.teardown(&task).await;
                Err(AppError::task_cancelled(&task.session_id))
            }
            Ok(LoopOutcome::Drained) => self.finish(task, chunk).await,
            Err(e) => {
                warn!(session_id = %task.session_id, error = %e, "Upload write failed");
                if let Err(update) = self
                    .tasks
                    .update_status(&task.session_id, UploadStatus::Failed)
                    .await
                {
                    warn!(
                        session_id = %task.session_id,
                        error = %update,
                        "Failed to mark upload as failed"
                    );
                }
                Err(e)
            }
        }
    }

    /// Drain `body` into the destination file, skipping every byte that is
    /// already on disk. `read_size` is the file offset of the body's first
    /// byte.
    async fn write_loop<S>(
        &self,
        task: &UploadTask,
        mut read_size: u64,
        body: S,
    ) -> AppResult<LoopOutcome>
    where
        S: Stream<Item = Result<Bytes, io::Error>> + Send,
    {
        let file = task.file_path()?;
        let mut on_disk = self.uploaded(task).await?;
        let mut sink = self
            .vfs
            .open_append(&file)
            .await
            .map_err(|e| AppError::write_failure(format!("Failed to open {file}"), e))?;
        let mut probe = self.signals.probe(
            &task.session_id,
            Duration::from_millis(self.config.cancel_poll_interval_ms),
        );
        let mut body = std::pin::pin!(body);

        loop {
            let next = body.next().await;
            // A cancel that lands after the last slice must still win.
            let cancelled = if next.is_some() {
                probe.poll().await?
            } else {
                probe.poll_now().await?
            };
            if cancelled {
                return Ok(LoopOutcome::Cancelled);
            }
            let Some(slice) = next else {
                break;
            };
            let slice =
                slice.map_err(|e| AppError::write_failure("Upload stream was interrupted", e))?;

            read_size += slice.len() as u64;
            if read_size <= on_disk {
                continue;
            }
            let fresh = usize::try_from(read_size - on_disk).unwrap_or(usize::MAX);
            let slice = if fresh < slice.len() {
                slice.slice(slice.len() - fresh..)
            } else {
                slice
            };
            sink.write_all(&slice)
                .await
                .map_err(|e| AppError::write_failure(format!("Failed to append to {file}"), e))?;
            sink.flush()
                .await
                .map_err(|e| AppError::write_failure(format!("Failed to flush {file}"), e))?;
            on_disk += slice.len() as u64;
        }

        sink.shutdown()
            .await
            .map_err(|e| AppError::write_failure(format!("Failed to close {file}"), e))?;
        Ok(LoopOutcome::Drained)
    }

    /// Remove the partial file and the record of a cancelled session.
    async fn teardown(&self, task: &UploadTask) {
        if let Ok(file) = task.file_path() {
            if let Err(e) = self.vfs.remove_file(&file).await {
                debug!(session_id = %task.session_id, error = %e, "Partial file already gone");
            }
        }
        if let Err(e) = self.tasks.delete_by_session_id(&task.session_id).await {
            warn!(session_id = %task.session_id, error = %e, "Failed to delete cancelled task");
        }
        info!(session_id = %task.session_id, "Upload cancelled");
    }

    async fn finish(
        &self,
        mut task: UploadTask,
        chunk: Option<ChunkInfo>,
    ) -> AppResult<UploadState> {
        let mut done = true;
        if let Some(mut info) = chunk {
            info.chunk_cur += 1;
            done = info.is_complete();
            task.set_chunk_info(Some(info));
        }
        task.status = if done {
            UploadStatus::Success
        } else {
            UploadStatus::Uploading
        };
        self.tasks
            .update_progress(&task.session_id, task.status, task.chunk_info())
            .await?;

        if done {
            self.signals.clear(&task.session_id).await?;
            let file = task.file_path()?;
            if let Ok(syspath) = self.vfs.physical_path(&file).await {
                self.thumbnails.schedule(syspath);
            }
            info!(
                session_id = %task.session_id,
                file = %file,
                size = task.size_bytes(),
                "Upload completed"
            );
        } else {
            debug!(session_id = %task.session_id, chunk_cur = ?task.chunk_cur, "Chunk received");
        }
        self.state(task).await
    }

    /// Ask the active writer of a session to stop. Returns whether one was
    /// signalled.
    pub async fn cancel(&self, ctx: &RequestContext, session_id: &str) -> AppResult<bool> {
        ctx.require_admin()?;
        self.find(session_id).await?;
        self.signals.cancel(session_id).await
    }

    /// Delete a session. Unfinished sessions lose their partial file.
    pub async fn delete(&self, ctx: &RequestContext, session_id: &str) -> AppResult<()> {
        ctx.require_admin()?;
        let Some(task) = self.tasks.find_by_session_id(session_id).await? else {
            return Ok(());
        };
        self.discard(&task).await?;
        info!(user = %ctx.username, session_id, "Upload task deleted");
        Ok(())
    }

    /// Delete every session in `status`. A session that cannot be removed is
    /// logged and skipped. Returns how many were removed.
    pub async fn clear(&self, ctx: &RequestContext, status: UploadStatus) -> AppResult<u64> {
        ctx.require_admin()?;
        let tasks = self.tasks.find_by_status(status).await?;
        let mut removed = 0;
        for task in &tasks {
            match self.discard(task).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!(session_id = %task.session_id, error = %e, "Failed to clear upload task");
                }
            }
        }
        info!(user = %ctx.username, %status, removed, "Upload tasks cleared");
        Ok(removed)
    }

    async fn discard(&self, task: &UploadTask) -> AppResult<()> {
        if task.status == UploadStatus::Uploading {
            self.signals.cancel(&task.session_id).await?;
        }
        if task.status != UploadStatus::Success {
            let file = task.file_path()?;
            if self.vfs.exists(&file).await? {
                if let Err(e) = self.vfs.remove_file(&file).await {
                    warn!(
                        session_id = %task.session_id,
                        error = %e,
                        "Failed to remove partial file"
                    );
                }
            }
        }
        self.tasks.delete_by_session_id(&task.session_id).await?;
        Ok(())
    }

    /// Every session, each with its on-disk progress.
    pub async fn list(&self, ctx: &RequestContext) -> AppResult<Vec<UploadState>> {
        ctx.require_admin()?;
        let mut states = Vec::new();
        for task in self.tasks.find_all().await? {
            states.push(self.state(task).await?);
        }
        Ok(states)
    }

    pub async fn info(&self, ctx: &RequestContext, session_id: &str) -> AppResult<UploadState> {
        ctx.require_admin()?;
        let task = self.find(session_id).await?;
        self.state(task).await
    }
}

#[cfg(test)]
mod tests {
    use lanyue_cache::CacheManager;
    use lanyue_cache::memory::MemoryCacheProvider;
    use lanyue_core::config::cache::MemoryCacheConfig;
    use lanyue_database::memory::MemoryUploadTaskRepository;
    use lanyue_entity::storage::OrderField;
    use lanyue_storage::{LocalBackend, MountPoint, MountTable};

    use super::*;

    #[derive(Debug)]
    struct NoThumbnails;

    impl ThumbnailScheduler for NoThumbnails {
        fn schedule(&self, _syspath: std::path::PathBuf) {}
    }

    async fn service(dir: &std::path::Path) -> UploadService {
        let table = MountTable::new();
        table
            .mount(MountPoint {
                name: "docs".into(),
                backend: Arc::new(LocalBackend::new(dir).await.unwrap()),
                capacity: 1000,
                order_field: OrderField::Name,
                reverse: false,
            })
            .await
            .unwrap();
        let cache = CacheManager::from_provider(Arc::new(MemoryCacheProvider::new(
            &MemoryCacheConfig::default(),
        )));
        UploadService::new(
            Arc::new(MemoryUploadTaskRepository::new()),
            Vfs::new(table),
            CancellationChannel::new(cache),
            Arc::new(NoThumbnails),
            FsConfig {
                chunk_size_bytes: 10,
                ..FsConfig::default()
            },
        )
    }

    fn request(name: &str, web_path: &str, size: u64, mode: UploadMode) -> CreateUpload {
        CreateUpload {
            path: "/docs".into(),
            web_path: web_path.into(),
            name: name.into(),
            size,
            modified: 1_700_000_000,
            mime_type: "text/plain".into(),
            mode,
            overwrite: false,
        }
    }

    #[tokio::test]
    async fn test_web_path_creates_nested_folders() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        let ctx = RequestContext::system();

        let state = svc
            .create_or_resume(&ctx, request("n.txt", "album/2024/n.txt", 5, UploadMode::Stream))
            .await
            .unwrap();
        assert_eq!(state.task.path, "/docs/album/2024");
        assert_eq!(state.task.web_path, "/album/2024/n.txt");
        assert!(dir.path().join("album/2024/n.txt").is_file());
    }

    #[tokio::test]
    async fn test_mismatched_web_path_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        let err = svc
            .create_or_resume(
                &RequestContext::system(),
                request("n.txt", "album/other.txt", 5, UploadMode::Stream),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_existing_file_without_overwrite_is_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("taken.txt"), b"x").unwrap();
        let svc = service(dir.path()).await;
        let ctx = RequestContext::system();

        let err = svc
            .create_or_resume(&ctx, request("taken.txt", "taken.txt", 5, UploadMode::Stream))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateName);

        let mut req = request("taken.txt", "taken.txt", 5, UploadMode::Stream);
        req.overwrite = true;
        let state = svc.create_or_resume(&ctx, req).await.unwrap();
        assert_eq!(state.uploaded, 0);
    }

    #[tokio::test]
    async fn test_upload_limit_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(dir.path()).await;
        svc.config.max_upload_size_bytes = 100;
        let err = svc
            .create_or_resume(
                &RequestContext::system(),
                request("big.bin", "big.bin", 101, UploadMode::Stream),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::CapacityExceeded);
    }

    #[tokio::test]
    async fn test_stream_into_chunk_session_is_mode_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        let ctx = RequestContext::system();
        let state = svc
            .create_or_resume(&ctx, request("c.txt", "c.txt", 5, UploadMode::Chunk))
            .await
            .unwrap();

        let body = futures::stream::iter(vec![Ok(Bytes::from_static(b"hello"))]);
        let err = svc
            .append_stream(&ctx, &state.task.session_id, body)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ModeMismatch);
    }

    #[tokio::test]
    async fn test_guests_cannot_upload() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        let guest = RequestContext::new("9", "guest", lanyue_entity::user::UserRole::Guest);
        let err = svc
            .create_or_resume(&guest, request("a.txt", "a.txt", 1, UploadMode::Stream))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);
    }
}
