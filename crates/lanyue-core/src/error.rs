//! Unified application error types for Lanyue.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. Filesystem and upload failures get
//! their own [`ErrorKind`] variants so the HTTP layer can report them
//! precisely.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The requested record was not found.
    NotFound,
    /// Authentication failed (missing or invalid token).
    Authentication,
    /// The caller does not have permission to perform the action.
    Authorization,
    /// Input validation failed.
    Validation,
    /// A conflict occurred (duplicate record, concurrent modification).
    Conflict,
    /// An internal server error occurred.
    Internal,
    /// A database error occurred.
    Database,
    /// A cache error occurred.
    Cache,
    /// A storage I/O error occurred outside an upload write loop.
    Storage,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// A virtual path does not resolve to an active mount or an existing entry.
    PathNotFound,
    /// A mount with the same name is already registered.
    DuplicateMount,
    /// The named mount is not registered.
    NotMounted,
    /// A move or copy batch does not fit into the destination mount.
    InsufficientCapacity,
    /// A declared upload does not fit into the size limit or the mount capacity.
    CapacityExceeded,
    /// An entry with the same name already exists at the destination.
    DuplicateName,
    /// A stream append was sent to a chunk session or vice versa.
    ModeMismatch,
    /// A chunk index does not match the session's cursor.
    ChunkOutOfOrder,
    /// The upload was cancelled while it was being written.
    TaskCancelled,
    /// The backend failed while appending upload bytes.
    WriteFailure,
    /// Another writer currently owns the upload session.
    SessionBusy,
    /// The requested byte range cannot be served.
    RangeNotSatisfiable,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Authentication => write!(f, "AUTHENTICATION"),
            Self::Authorization => write!(f, "AUTHORIZATION"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Internal => write!(f, "INTERNAL"),
            Self::Database => write!(f, "DATABASE"),
            Self::Cache => write!(f, "CACHE"),
            Self::Storage => write!(f, "STORAGE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::PathNotFound => write!(f, "PATH_NOT_FOUND"),
            Self::DuplicateMount => write!(f, "DUPLICATE_MOUNT"),
            Self::NotMounted => write!(f, "NOT_MOUNTED"),
            Self::InsufficientCapacity => write!(f, "INSUFFICIENT_CAPACITY"),
            Self::CapacityExceeded => write!(f, "CAPACITY_EXCEEDED"),
            Self::DuplicateName => write!(f, "DUPLICATE_NAME"),
            Self::ModeMismatch => write!(f, "MODE_MISMATCH"),
            Self::ChunkOutOfOrder => write!(f, "CHUNK_OUT_OF_ORDER"),
            Self::TaskCancelled => write!(f, "TASK_CANCELLED"),
            Self::WriteFailure => write!(f, "WRITE_FAILURE"),
            Self::SessionBusy => write!(f, "SESSION_BUSY"),
            Self::RangeNotSatisfiable => write!(f, "RANGE_NOT_SATISFIABLE"),
        }
    }
}

/// The unified application error used throughout Lanyue.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether this error belongs to the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cache, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// The virtual path `path` could not be resolved.
    pub fn path_not_found(path: impl fmt::Display) -> Self {
        Self::new(ErrorKind::PathNotFound, format!("Path not found: {path}"))
    }

    pub fn duplicate_mount(name: &str) -> Self {
        Self::new(
            ErrorKind::DuplicateMount,
            format!("Mount '{name}' is already registered"),
        )
    }

    pub fn not_mounted(name: &str) -> Self {
        Self::new(ErrorKind::NotMounted, format!("Mount '{name}' is not registered"))
    }

    pub fn insufficient_capacity(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InsufficientCapacity, message)
    }

    pub fn capacity_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CapacityExceeded, message)
    }

    pub fn duplicate_name(name: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::DuplicateName,
            format!("An entry named '{name}' already exists"),
        )
    }

    pub fn mode_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ModeMismatch, message)
    }

    pub fn chunk_out_of_order(expected: u64, received: u64) -> Self {
        Self::new(
            ErrorKind::ChunkOutOfOrder,
            format!("Expected chunk {expected}, received chunk {received}"),
        )
    }

    pub fn task_cancelled(session_id: &str) -> Self {
        Self::new(
            ErrorKind::TaskCancelled,
            format!("Upload {session_id} was cancelled"),
        )
    }

    pub fn write_failure(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::with_source(ErrorKind::WriteFailure, message, source)
    }

    pub fn session_busy(session_id: &str) -> Self {
        Self::new(
            ErrorKind::SessionBusy,
            format!("Upload {session_id} is already being written"),
        )
    }

    pub fn range_not_satisfiable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RangeNotSatisfiable, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Storage, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_kind_code() {
        let err = AppError::chunk_out_of_order(1, 3);
        assert_eq!(
            err.to_string(),
            "CHUNK_OUT_OF_ORDER: Expected chunk 1, received chunk 3"
        );
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: AppError = io.into();
        assert!(err.is(ErrorKind::Storage));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_clone_drops_source() {
        let io = std::io::Error::other("disk");
        let err = AppError::write_failure("append failed", io);
        let cloned = err.clone();
        assert_eq!(cloned.kind, ErrorKind::WriteFailure);
        assert!(cloned.source.is_none());
    }
}
