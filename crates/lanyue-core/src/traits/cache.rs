//! Cache provider trait for the ephemeral key-value store.

use std::time::Duration;

use async_trait::async_trait;

use crate::result::AppResult;

/// Trait for ephemeral key-value backends (Redis or in-memory).
///
/// Nothing written here survives a restart of the backing store. The
/// provider is responsible for key prefixing and TTL enforcement; a TTL of
/// `None` keeps the entry until it is deleted.
#[async_trait]
pub trait CacheProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Get a value by key. Returns `None` if the key does not exist or has expired.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Set a value, replacing any existing one.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<()>;

    /// Set a value only if the key does not already exist (NX).
    /// Returns `true` if the value was set, `false` if the key already existed.
    async fn set_nx(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<bool>;

    /// Delete a key. Returns `true` if a value was removed.
    async fn delete(&self, key: &str) -> AppResult<bool>;

    /// Check whether a key exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Check that the cache backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
