//! Maps domain `AppError` to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use lanyue_core::error::{AppError, ErrorKind};

/// Standard API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Always `false`.
    pub success: bool,
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}

/// Handler error wrapping the domain error.
#[derive(Debug)]
pub struct ApiError(pub AppError);

/// Result type returned by handlers.
pub type ApiResult<T> = Result<T, ApiError>;

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

/// HTTP status reported for an error kind.
pub fn status_of(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::ModeMismatch | ErrorKind::ChunkOutOfOrder => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::NotFound | ErrorKind::PathNotFound | ErrorKind::NotMounted => {
            StatusCode::NOT_FOUND
        }
        ErrorKind::Conflict
        | ErrorKind::DuplicateMount
        | ErrorKind::DuplicateName
        | ErrorKind::SessionBusy => StatusCode::CONFLICT,
        ErrorKind::TaskCancelled => StatusCode::GONE,
        ErrorKind::CapacityExceeded => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::InsufficientCapacity => StatusCode::INSUFFICIENT_STORAGE,
        ErrorKind::RangeNotSatisfiable => StatusCode::RANGE_NOT_SATISFIABLE,
        ErrorKind::Internal
        | ErrorKind::Database
        | ErrorKind::Cache
        | ErrorKind::Storage
        | ErrorKind::Configuration
        | ErrorKind::Serialization
        | ErrorKind::WriteFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = status_of(err.kind);
        if status.is_server_error() {
            tracing::error!(kind = %err.kind, error = ?err, "Request failed");
        }

        let body = ApiErrorResponse {
            success: false,
            error: err.kind.to_string(),
            message: err.message,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_statuses() {
        assert_eq!(status_of(ErrorKind::PathNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_of(ErrorKind::SessionBusy), StatusCode::CONFLICT);
        assert_eq!(status_of(ErrorKind::ChunkOutOfOrder), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(ErrorKind::CapacityExceeded), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            status_of(ErrorKind::RangeNotSatisfiable),
            StatusCode::RANGE_NOT_SATISFIABLE
        );
    }

    #[test]
    fn test_duplicate_name_is_conflict() {
        let response = ApiError(AppError::duplicate_name("a.txt")).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
