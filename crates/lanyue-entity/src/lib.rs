//! # lanyue-entity
//!
//! Persisted records for Lanyue. Every struct in this crate represents a
//! database table row or a value stored in one. Row structs derive
//! `sqlx::FromRow`; enums map to PostgreSQL enum types.

pub mod storage;
pub mod upload;
pub mod user;
