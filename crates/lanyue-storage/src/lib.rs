//! # lanyue-storage
//!
//! The storage layer of Lanyue: physical backends, the mount table that
//! routes virtual paths to them, the [`Vfs`] façade over the whole
//! namespace, thumbnail generation, and directory archiving.

pub mod archive;
pub mod mount;
pub mod providers;
pub mod thumbnail;
pub mod vfs;

pub use mount::{MountPoint, MountTable};
pub use providers::local::LocalBackend;
pub use vfs::{DirEntry, Vfs};
