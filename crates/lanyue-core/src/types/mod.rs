//! Core type definitions used across the Lanyue workspace.

pub mod pagination;
pub mod path;

pub use pagination::{PageRequest, PageResponse};
pub use path::VirtualPath;
