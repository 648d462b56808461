//! Upload session handlers.

use std::io;

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use futures::TryStreamExt;

use lanyue_service::upload::{CreateUpload, UploadState};

use crate::dto::ApiResponse;
use crate::dto::request::{ClearRequest, SessionRequest};
use crate::dto::response::{CancelResponse, CountResponse};
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

type Reply<T> = ApiResult<Json<ApiResponse<T>>>;

/// POST /api/upload_task/create
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateUpload>,
) -> Reply<UploadState> {
    let upload = state.upload_service.create_or_resume(&auth, req).await?;
    Ok(ApiResponse::json(upload))
}

/// POST /api/upload_task/stream/{session_id}
pub async fn stream(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(session_id): Path<String>,
    body: Body,
) -> Reply<UploadState> {
    let data = body.into_data_stream().map_err(io::Error::other);
    let upload = state
        .upload_service
        .append_stream(&auth, &session_id, data)
        .await?;
    Ok(ApiResponse::json(upload))
}

/// POST /api/upload_task/chunk/{session_id}/{chunk}
pub async fn chunk(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((session_id, chunk)): Path<(String, u64)>,
    body: Body,
) -> Reply<UploadState> {
    let data = body.into_data_stream().map_err(io::Error::other);
    let upload = state
        .upload_service
        .append_chunk(&auth, &session_id, chunk, data)
        .await?;
    Ok(ApiResponse::json(upload))
}

/// POST /api/upload_task/list
pub async fn list(State(state): State<AppState>, auth: AuthUser) -> Reply<Vec<UploadState>> {
    Ok(ApiResponse::json(state.upload_service.list(&auth).await?))
}

/// POST /api/upload_task/info
pub async fn info(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<SessionRequest>,
) -> Reply<UploadState> {
    Ok(ApiResponse::json(
        state.upload_service.info(&auth, &req.session_id).await?,
    ))
}

/// POST /api/upload_task/cancel
pub async fn cancel(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<SessionRequest>,
) -> Reply<CancelResponse> {
    let cancelled = state.upload_service.cancel(&auth, &req.session_id).await?;
    Ok(ApiResponse::json(CancelResponse { cancelled }))
}

/// POST /api/upload_task/delete
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<SessionRequest>,
) -> Reply<()> {
    state.upload_service.delete(&auth, &req.session_id).await?;
    Ok(ApiResponse::json(()))
}

/// POST /api/upload_task/clear
pub async fn clear(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ClearRequest>,
) -> Reply<CountResponse> {
    let count = state.upload_service.clear(&auth, req.status).await?;
    Ok(ApiResponse::json(CountResponse { count }))
}
