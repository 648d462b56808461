//! Storage mount records.

pub mod model;
pub mod order;

pub use model::{CreateStorage, StorageMount, UpdateStorage};
pub use order::OrderField;
