//! # lanyue-api
//!
//! HTTP API layer for Lanyue built on Axum.
//!
//! Provides the REST endpoints for uploads, storage administration and the
//! file manager, the bearer-token extractor, request logging, DTOs and the
//! mapping of domain errors to HTTP responses.

pub mod auth;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
