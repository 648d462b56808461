//! Cache manager that dispatches to the configured provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use lanyue_core::config::cache::CacheConfig;
use lanyue_core::error::AppError;
use lanyue_core::result::AppResult;
use lanyue_core::traits::cache::CacheProvider;

/// Cache manager that wraps the configured cache provider.
///
/// Entries written without a TTL fall back to the configured default TTL;
/// a default of zero keeps them until they are deleted.
#[derive(Debug, Clone)]
pub struct CacheManager {
    inner: Arc<dyn CacheProvider>,
    default_ttl: Option<Duration>,
}

impl CacheManager {
    /// Create a new cache manager from configuration.
    pub async fn new(config: &CacheConfig) -> AppResult<Self> {
        let inner: Arc<dyn CacheProvider> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis cache provider");
                let client = crate::redis::RedisClient::connect(&config.redis).await?;
                Arc::new(crate::redis::RedisCacheProvider::new(client))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory cache provider");
                Arc::new(crate::memory::MemoryCacheProvider::new(&config.memory))
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown cache provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        let default_ttl = (config.default_ttl_seconds > 0)
            .then(|| Duration::from_secs(config.default_ttl_seconds));
        Ok(Self { inner, default_ttl })
    }

    /// Create a cache manager from an existing provider (for testing).
    pub fn from_provider(provider: Arc<dyn CacheProvider>) -> Self {
        Self {
            inner: provider,
            default_ttl: None,
        }
    }

    fn ttl_or_default(&self, ttl: Option<Duration>) -> Option<Duration> {
        ttl.or(self.default_ttl)
    }

    /// Set a value only if absent, never applying the default TTL. For
    /// markers whose disappearance carries meaning.
    pub async fn set_nx_persistent(&self, key: &str, value: &str) -> AppResult<bool> {
        self.inner.set_nx(key, value, None).await
    }
}

#[async_trait]
impl CacheProvider for CacheManager {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<()> {
        self.inner.set(key, value, self.ttl_or_default(ttl)).await
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<bool> {
        self.inner.set_nx(key, value, self.ttl_or_default(ttl)).await
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.inner.exists(key).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use lanyue_core::config::cache::MemoryCacheConfig;

    use super::*;
    use crate::memory::MemoryCacheProvider;

    #[tokio::test]
    async fn test_rejects_unknown_provider() {
        let config = CacheConfig {
            provider: "memcached".to_string(),
            ..CacheConfig::default()
        };
        let err = CacheManager::new(&config).await.unwrap_err();
        assert_eq!(err.kind, lanyue_core::ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_dispatches_to_provider() {
        let provider = MemoryCacheProvider::new(&MemoryCacheConfig::default());
        let manager = CacheManager::from_provider(Arc::new(provider));
        assert!(manager.set_nx("k", "v", None).await.unwrap());
        assert_eq!(manager.get("k").await.unwrap().as_deref(), Some("v"));
        assert!(manager.delete("k").await.unwrap());
        assert!(!manager.exists("k").await.unwrap());
    }
}
