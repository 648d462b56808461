//! # lanyue-core
//!
//! Core crate for Lanyue. Contains the storage and cache traits,
//! configuration schemas, virtual path handling, pagination types,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other Lanyue crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
