//! # lanyue-database
//!
//! PostgreSQL connection management and repositories for storage mounts
//! and upload sessions, plus in-process implementations of the same
//! repositories for single-node deployments and tests.

pub mod memory;
pub mod postgres;
pub mod repositories;

pub use postgres::PgRecordStore;
pub use repositories::{Repositories, StorageRepository, UploadTaskRepository};
