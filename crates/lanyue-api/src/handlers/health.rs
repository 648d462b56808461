//! Health check handler.

use axum::Json;
use axum::extract::State;

use lanyue_core::traits::cache::CacheProvider;

use crate::dto::ApiResponse;
use crate::dto::response::HealthResponse;
use crate::state::AppState;

fn status(ok: bool) -> String {
    if ok { "connected" } else { "unavailable" }.to_string()
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let database = state.repositories.health_check().await.unwrap_or(false);
    let cache = state.cache.health_check().await.unwrap_or(false);

    ApiResponse::json(HealthResponse {
        status: if database && cache { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        database: status(database),
        cache: status(cache),
        mounts: state.mounts.list().await.len(),
    })
}
