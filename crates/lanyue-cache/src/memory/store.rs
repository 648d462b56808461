//! In-memory cache implementation using the moka crate.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use tracing::debug;

use lanyue_core::config::cache::MemoryCacheConfig;
use lanyue_core::result::AppResult;
use lanyue_core::traits::cache::CacheProvider;

/// A stored value together with its own time to live.
#[derive(Debug, Clone)]
struct Entry {
    value: String,
    ttl: Option<Duration>,
}

/// Expires each entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        entry.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        entry.ttl
    }
}

/// In-memory cache provider using moka.
#[derive(Debug, Clone)]
pub struct MemoryCacheProvider {
    cache: Cache<String, Entry>,
}

impl MemoryCacheProvider {
    /// Create a new in-memory cache from configuration.
    pub fn new(config: &MemoryCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.cache.get(key).await.map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<()> {
        let entry = Entry {
            value: value.to_string(),
            ttl,
        };
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<bool> {
        let entry = Entry {
            value: value.to_string(),
            ttl,
        };
        let stored = self
            .cache
            .entry(key.to_string())
            .or_insert_with(async move { entry })
            .await;
        debug!(key, inserted = stored.is_fresh(), "set_nx");
        Ok(stored.is_fresh())
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        Ok(self.cache.remove(key).await.is_some())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.cache.contains_key(key))
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_provider() -> MemoryCacheProvider {
        MemoryCacheProvider::new(&MemoryCacheConfig { max_capacity: 1000 })
    }

    #[tokio::test]
    async fn test_set_get() {
        let provider = make_provider();
        provider.set("key1", "value1", None).await.unwrap();
        let val = provider.get("key1").await.unwrap();
        assert_eq!(val, Some("value1".to_string()));
    }

    #[tokio::test]
    async fn test_delete_reports_presence() {
        let provider = make_provider();
        provider.set("key2", "value2", None).await.unwrap();
        assert!(provider.delete("key2").await.unwrap());
        assert!(!provider.delete("key2").await.unwrap());
        assert_eq!(provider.get("key2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_nx() {
        let provider = make_provider();
        assert!(provider.set_nx("nx_key", "val", None).await.unwrap());
        assert!(!provider.set_nx("nx_key", "val2", None).await.unwrap());
        assert_eq!(provider.get("nx_key").await.unwrap().as_deref(), Some("val"));
    }

    #[tokio::test]
    async fn test_entry_ttl_expires() {
        let provider = make_provider();
        provider
            .set("short", "v", Some(Duration::from_millis(20)))
            .await
            .unwrap();
        provider.set("forever", "v", None).await.unwrap();
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(provider.get("short").await.unwrap(), None);
        assert!(provider.exists("forever").await.unwrap());
    }

    #[tokio::test]
    async fn test_health_check() {
        assert!(make_provider().health_check().await.unwrap());
    }
}
