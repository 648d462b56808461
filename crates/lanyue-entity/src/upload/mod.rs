//! Upload session records.

pub mod model;
pub mod status;

pub use model::{ChunkInfo, NewUploadTask, UploadTask};
pub use status::{UploadMode, UploadStatus};
