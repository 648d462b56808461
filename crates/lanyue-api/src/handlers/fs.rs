//! File manager, download and thumbnail handlers.

use std::io::SeekFrom;
use std::path::PathBuf;

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use lanyue_core::error::AppError;
use lanyue_core::types::{PageRequest, PageResponse, VirtualPath};
use lanyue_service::fs::{ByteRange, DownloadSource, FileEntry};
use lanyue_storage::DirEntry;

use crate::dto::ApiResponse;
use crate::dto::request::{
    NamedPathRequest, PathRequest, RemoveRequest, SearchRequest, SourceQuery, TransferRequest,
};
use crate::dto::response::{BatchResponse, CountResponse};
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

type Reply<T> = ApiResult<Json<ApiResponse<T>>>;

/// Read size of download streams.
const DOWNLOAD_CHUNK: usize = 2 * 1024 * 1024;

/// POST /api/fs/list
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<PathRequest>,
) -> Reply<PageResponse<FileEntry>> {
    let page = state.file_service.page(req.page);
    let entries = state
        .file_service
        .list(&auth, &req.virtual_path()?, page)
        .await?;
    Ok(ApiResponse::json(entries))
}

/// POST /api/fs/files
pub async fn files(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<PathRequest>,
) -> Reply<Vec<FileEntry>> {
    let files = state
        .file_service
        .list_files(&auth, &req.virtual_path()?)
        .await?;
    Ok(ApiResponse::json(files))
}

/// POST /api/fs/dirs
pub async fn dirs(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<PathRequest>,
) -> Reply<PageResponse<DirEntry>> {
    let page = state.file_service.page(req.page);
    let dirs = state
        .file_service
        .list_dirs(&auth, &req.virtual_path()?, page)
        .await?;
    Ok(ApiResponse::json(dirs))
}

/// POST /api/fs/mkdir
pub async fn mkdir(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<NamedPathRequest>,
) -> Reply<DirEntry> {
    let dir = VirtualPath::parse(&req.path)?;
    Ok(ApiResponse::json(
        state.file_service.mkdir(&auth, &dir, &req.name).await?,
    ))
}

/// POST /api/fs/rename
pub async fn rename(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<NamedPathRequest>,
) -> Reply<DirEntry> {
    let path = VirtualPath::parse(&req.path)?;
    Ok(ApiResponse::json(
        state.file_service.rename(&auth, &path, &req.name).await?,
    ))
}

/// POST /api/fs/detail
pub async fn detail(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<PathRequest>,
) -> Reply<FileEntry> {
    Ok(ApiResponse::json(
        state.file_service.detail(&auth, &req.virtual_path()?).await?,
    ))
}

/// POST /api/fs/move
pub async fn move_entries(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<TransferRequest>,
) -> Reply<BatchResponse> {
    let src = VirtualPath::parse(&req.src_dir)?;
    let dst = VirtualPath::parse(&req.dst_dir)?;
    let names = state
        .file_service
        .move_entries(&auth, &src, &dst, &req.names)
        .await?;
    Ok(ApiResponse::json(BatchResponse { names }))
}

/// POST /api/fs/copy
pub async fn copy_entries(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<TransferRequest>,
) -> Reply<BatchResponse> {
    let src = VirtualPath::parse(&req.src_dir)?;
    let dst = VirtualPath::parse(&req.dst_dir)?;
    let names = state
        .file_service
        .copy_entries(&auth, &src, &dst, &req.names)
        .await?;
    Ok(ApiResponse::json(BatchResponse { names }))
}

/// POST /api/fs/remove
pub async fn remove(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<RemoveRequest>,
) -> Reply<BatchResponse> {
    let dir = VirtualPath::parse(&req.path)?;
    let names = state
        .file_service
        .remove_entries(&auth, &dir, &req.names)
        .await?;
    Ok(ApiResponse::json(BatchResponse { names }))
}

/// POST /api/fs/clear_empty_dir
pub async fn clear_empty_dir(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<PathRequest>,
) -> Reply<CountResponse> {
    let count = state
        .file_service
        .clear_empty_dirs(&auth, &req.virtual_path()?)
        .await?;
    Ok(ApiResponse::json(CountResponse { count }))
}

/// POST /api/fs/search
pub async fn search(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<SearchRequest>,
) -> Reply<PageResponse<DirEntry>> {
    let dir = VirtualPath::parse(&req.path)?;
    let page: PageRequest = state.file_service.page(req.page);
    let found = state
        .file_service
        .search(&auth, &dir, &req.name, req.is_dir, page)
        .await?;
    Ok(ApiResponse::json(found))
}

/// Deletes a temporary archive once the response body is dropped.
struct TempFile(PathBuf);

impl Drop for TempFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.0) {
            Ok(()) => debug!(path = %self.0.display(), "Removed temporary archive"),
            Err(e) => warn!(
                path = %self.0.display(),
                error = %e,
                "Failed to remove temporary archive"
            ),
        }
    }
}

/// RFC 5987 encoding of a file name for `Content-Disposition`.
fn encode_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || b"-._~".contains(&byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

fn header_value(value: String) -> ApiResult<HeaderValue> {
    HeaderValue::from_str(&value)
        .map_err(|e| AppError::internal(format!("Invalid header value: {e}")).into())
}

/// GET /api/fs/source?path=
///
/// Streams a file, or a zip of a directory, honouring a single `Range`.
pub async fn source(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<SourceQuery>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let path = VirtualPath::parse(&query.path)?;
    let DownloadSource {
        path: file_path,
        file_name,
        mime,
        len,
        delete_after,
    } = state.download_service.prepare(&auth, &path).await?;
    let cleanup = delete_after.then(|| TempFile(file_path.clone()));

    let range = match headers.get(header::RANGE).and_then(|v| v.to_str().ok()) {
        Some(raw) => Some(ByteRange::parse(raw, len)?),
        None => None,
    };

    let mut file = tokio::fs::File::open(&file_path).await.map_err(AppError::from)?;
    let (status, body_len) = match range {
        Some(range) => {
            file.seek(SeekFrom::Start(range.start))
                .await
                .map_err(AppError::from)?;
            (StatusCode::PARTIAL_CONTENT, range.len())
        }
        None => (StatusCode::OK, len),
    };
    let stream = ReaderStream::with_capacity(file.take(body_len), DOWNLOAD_CHUNK).map(move |chunk| {
        let _keep = &cleanup;
        chunk
    });

    let mut response = Body::from_stream(stream).into_response();
    *response.status_mut() = status;
    let out = response.headers_mut();
    out.insert(header::CONTENT_TYPE, header_value(mime)?);
    out.insert(header::CONTENT_LENGTH, HeaderValue::from(body_len));
    out.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    out.insert("x-file-length", HeaderValue::from(len));
    out.insert(
        header::CONTENT_DISPOSITION,
        header_value(format!(
            "attachment; filename*=UTF-8''{}",
            encode_filename(&file_name)
        ))?,
    );
    if let Some(range) = range {
        out.insert(header::CONTENT_RANGE, header_value(range.content_range())?);
    }
    Ok(response)
}

/// GET /api/fs/thumbnail/{year}/{month}/{ident}
///
/// Public. A thumbnail that does not exist yet yields an empty body.
pub async fn thumbnail(
    State(state): State<AppState>,
    Path((year, month, ident)): Path<(String, String, String)>,
) -> ApiResult<Response> {
    let file = state.thumbnails.cached_file(&year, &month, &ident)?;
    let data = match tokio::fs::read(&file).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(AppError::from(e).into()),
    };
    let mime = lanyue_storage::providers::mime_from_name(&ident)
        .unwrap_or_else(|| "application/octet-stream".to_string());
    Ok(([(header::CONTENT_TYPE, mime)], data).into_response())
}
