//! Core traits defined in `lanyue-core` and implemented by other crates.

pub mod cache;
pub mod storage;

pub use cache::CacheProvider;
pub use storage::{ByteSink, EntryMeta, StorageBackend};
