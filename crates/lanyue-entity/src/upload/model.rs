//! Upload task entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use lanyue_core::AppResult;
use lanyue_core::types::VirtualPath;

use super::status::{UploadMode, UploadStatus};

/// Fixed chunk layout of a chunk-mode upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkInfo {
    /// Bytes per chunk; the last chunk may be shorter.
    pub chunk_size: u64,
    /// Number of chunks, at least 1.
    pub chunk_total: u64,
    /// Index of the next expected chunk.
    pub chunk_cur: u64,
}

impl ChunkInfo {
    /// Layout for a file of `size` bytes cut into `chunk_size` pieces.
    pub fn layout(size: u64, chunk_size: u64) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_total: size.div_ceil(chunk_size).max(1),
            chunk_cur: 0,
        }
    }

    /// Whether every chunk has been received.
    pub fn is_complete(&self) -> bool {
        self.chunk_cur >= self.chunk_total
    }
}

/// One persisted upload session.
///
/// Upload progress is deliberately absent: the byte length of the
/// destination file is the only record of how much has been received.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UploadTask {
    /// Numeric identifier.
    pub id: i64,
    /// Deterministic session identifier derived from the file metadata.
    pub session_id: String,
    /// Virtual directory the file is written into.
    pub path: String,
    /// Client-relative path used to recreate nested folders.
    pub web_path: String,
    pub name: String,
    /// Declared size in bytes.
    pub size: i64,
    /// Declared modification time, as sent by the client.
    pub modified: i64,
    pub mime_type: String,
    pub status: UploadStatus,
    pub mode: UploadMode,
    /// Whether an existing file of the same name was replaced.
    pub overwrite: bool,
    pub chunk_size: Option<i64>,
    pub chunk_total: Option<i64>,
    pub chunk_cur: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UploadTask {
    /// Declared size as an unsigned byte count.
    pub fn size_bytes(&self) -> u64 {
        u64::try_from(self.size).unwrap_or(0)
    }

    /// Virtual path of the destination file.
    pub fn file_path(&self) -> AppResult<VirtualPath> {
        VirtualPath::parse(&self.path)?.join(&self.name)
    }

    /// Chunk layout, present only in chunk mode.
    pub fn chunk_info(&self) -> Option<ChunkInfo> {
        match (self.chunk_size, self.chunk_total, self.chunk_cur) {
            (Some(size), Some(total), Some(cur)) => Some(ChunkInfo {
                chunk_size: u64::try_from(size).unwrap_or(0),
                chunk_total: u64::try_from(total).unwrap_or(0),
                chunk_cur: u64::try_from(cur).unwrap_or(0),
            }),
            _ => None,
        }
    }

    /// Replace the stored chunk layout.
    pub fn set_chunk_info(&mut self, info: Option<ChunkInfo>) {
        self.chunk_size = info.map(|c| c.chunk_size as i64);
        self.chunk_total = info.map(|c| c.chunk_total as i64);
        self.chunk_cur = info.map(|c| c.chunk_cur as i64);
    }
}

/// Data required to persist a new upload session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUploadTask {
    pub session_id: String,
    pub path: String,
    pub web_path: String,
    pub name: String,
    pub size: i64,
    pub modified: i64,
    pub mime_type: String,
    pub mode: UploadMode,
    pub overwrite: bool,
    pub chunk_info: Option<ChunkInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_rounds_up() {
        let info = ChunkInfo::layout(25, 10);
        assert_eq!(info.chunk_total, 3);
        assert_eq!(info.chunk_cur, 0);
        assert!(!info.is_complete());
    }

    #[test]
    fn test_layout_empty_file_has_one_chunk() {
        assert_eq!(ChunkInfo::layout(0, 10).chunk_total, 1);
        assert_eq!(ChunkInfo::layout(10, 10).chunk_total, 1);
    }
}
