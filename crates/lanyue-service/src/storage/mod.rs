//! Storage administration: records of mounts and their live counterparts.

pub mod service;

pub use service::{StorageService, StorageSummary};
