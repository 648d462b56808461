//! Upload status and mode enumerations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use lanyue_core::AppError;

/// Lifecycle state of an upload session.
///
/// `Uploading` moves to `Success` (terminal) or `Failed`. A failed session
/// resumes as `Uploading` when the client calls append again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "upload_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Uploading,
    Success,
    Failed,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploading => "uploading",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UploadStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uploading" => Ok(Self::Uploading),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(AppError::validation(format!("Invalid upload status: '{s}'"))),
        }
    }
}

/// How the client delivers the file body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "upload_mode", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    /// One request body carrying the whole file.
    Stream,
    /// Fixed-size chunks sent in order.
    Chunk,
}

impl UploadMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::Chunk => "chunk",
        }
    }
}

impl fmt::Display for UploadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
