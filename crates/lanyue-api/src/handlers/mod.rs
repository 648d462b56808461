//! Request handlers, one module per route group.

pub mod fs;
pub mod health;
pub mod storage;
pub mod upload;
