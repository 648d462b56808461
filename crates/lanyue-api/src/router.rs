//! Route definitions for the Lanyue HTTP API.
//!
//! All routes are organized by domain and mounted under `/api`.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(upload_routes())
        .merge(storage_routes())
        .merge(fs_routes())
        .route("/health", get(handlers::health::health));

    let cors = middleware::cors::build_cors_layer(&state.config.server.cors);

    Router::new()
        .nest("/api", api_routes)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Upload sessions
fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/upload_task/create", post(handlers::upload::create))
        .route(
            "/upload_task/stream/{session_id}",
            post(handlers::upload::stream),
        )
        .route(
            "/upload_task/chunk/{session_id}/{chunk}",
            post(handlers::upload::chunk),
        )
        .route("/upload_task/list", post(handlers::upload::list))
        .route("/upload_task/info", post(handlers::upload::info))
        .route("/upload_task/cancel", post(handlers::upload::cancel))
        .route("/upload_task/delete", post(handlers::upload::delete))
        .route("/upload_task/clear", post(handlers::upload::clear))
}

/// Storage administration
fn storage_routes() -> Router<AppState> {
    Router::new()
        .route("/storage/order_field", post(handlers::storage::order_fields))
        .route("/storage/create", post(handlers::storage::create))
        .route("/storage/list", post(handlers::storage::list))
        .route("/storage/update", post(handlers::storage::update))
        .route("/storage/info", post(handlers::storage::info))
        .route("/storage/enable", post(handlers::storage::enable))
        .route("/storage/disable", post(handlers::storage::disable))
        .route("/storage/delete", post(handlers::storage::delete))
}

/// File manager, downloads and thumbnails
fn fs_routes() -> Router<AppState> {
    Router::new()
        .route("/fs/list", post(handlers::fs::list))
        .route("/fs/files", post(handlers::fs::files))
        .route("/fs/dirs", post(handlers::fs::dirs))
        .route("/fs/mkdir", post(handlers::fs::mkdir))
        .route("/fs/rename", post(handlers::fs::rename))
        .route("/fs/detail", post(handlers::fs::detail))
        .route("/fs/move", post(handlers::fs::move_entries))
        .route("/fs/copy", post(handlers::fs::copy_entries))
        .route("/fs/remove", post(handlers::fs::remove))
        .route("/fs/clear_empty_dir", post(handlers::fs::clear_empty_dir))
        .route("/fs/search", post(handlers::fs::search))
        .route("/fs/source", get(handlers::fs::source))
        .route(
            "/fs/thumbnail/{year}/{month}/{ident}",
            get(handlers::fs::thumbnail),
        )
}
