//! # lanyue-service
//!
//! Business logic service layer for Lanyue. Each service orchestrates the
//! record store, the ephemeral cache and the virtual filesystem to
//! implement one group of use cases.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time, and every shared registry is owned by the
//! application state built at startup.

pub mod context;
pub mod fs;
pub mod storage;
pub mod upload;

pub use context::RequestContext;
pub use fs::{DownloadService, FileService};
pub use storage::StorageService;
pub use upload::UploadService;
