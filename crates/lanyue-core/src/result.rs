//! Convenience result type alias for Lanyue.

use crate::error::AppError;

/// A specialized `Result` type for Lanyue operations.
pub type AppResult<T> = Result<T, AppError>;
