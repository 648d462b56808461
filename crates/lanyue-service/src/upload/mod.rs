//! Resumable uploads: session identity, the cancellation signal, the
//! single-writer guard and the upload controller itself.

pub mod guard;
pub mod service;
pub mod session_id;
pub mod signal;

pub use guard::{WriterGuard, WriterPermit};
pub use service::{CreateUpload, UploadService, UploadState};
pub use session_id::session_id;
pub use signal::{CancellationChannel, CancellationProbe};
