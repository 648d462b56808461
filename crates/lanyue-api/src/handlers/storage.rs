//! Storage administration handlers.

use axum::Json;
use axum::extract::State;

use lanyue_entity::storage::StorageMount;
use lanyue_service::storage::StorageSummary;

use crate::dto::ApiResponse;
use crate::dto::request::{CreateStorageRequest, IdRequest, UpdateStorageRequest};
use crate::dto::response::{DeletedResponse, OrderFieldOption};
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

type Reply<T> = ApiResult<Json<ApiResponse<T>>>;

/// POST /api/storage/order_field
pub async fn order_fields(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Reply<Vec<OrderFieldOption>> {
    auth.require_admin()?;
    let fields = state
        .storage_service
        .order_fields()
        .into_iter()
        .map(OrderFieldOption::from)
        .collect();
    Ok(ApiResponse::json(fields))
}

/// POST /api/storage/create
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateStorageRequest>,
) -> Reply<StorageMount> {
    let data = req.into_create(state.config.fs.default_mount_capacity_bytes);
    Ok(ApiResponse::json(state.storage_service.create(&auth, data).await?))
}

/// POST /api/storage/list
pub async fn list(State(state): State<AppState>, auth: AuthUser) -> Reply<Vec<StorageSummary>> {
    Ok(ApiResponse::json(state.storage_service.list(&auth).await?))
}

/// POST /api/storage/info
pub async fn info(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<IdRequest>,
) -> Reply<StorageSummary> {
    Ok(ApiResponse::json(state.storage_service.info(&auth, req.id).await?))
}

/// POST /api/storage/update
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<UpdateStorageRequest>,
) -> Reply<StorageMount> {
    Ok(ApiResponse::json(
        state.storage_service.update(&auth, req.id, req.data).await?,
    ))
}

/// POST /api/storage/enable
pub async fn enable(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<IdRequest>,
) -> Reply<StorageMount> {
    Ok(ApiResponse::json(state.storage_service.enable(&auth, req.id).await?))
}

/// POST /api/storage/disable
pub async fn disable(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<IdRequest>,
) -> Reply<StorageMount> {
    Ok(ApiResponse::json(state.storage_service.disable(&auth, req.id).await?))
}

/// POST /api/storage/delete
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<IdRequest>,
) -> Reply<DeletedResponse> {
    let deleted = state.storage_service.delete(&auth, req.id).await?;
    Ok(ApiResponse::json(DeletedResponse { deleted }))
}
