//! Cache store adapter with key normalization and graceful degradation
//!
//! Uses enum dispatch over the concrete providers (no vtable). Raw cache
//! keys are normalized here — optional md5 digest, then namespace prefix —
//! so every provider sees final wire keys and the invalidation service can
//! rebuild the same keys independently.

use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::errors::CacheResult;
use crate::store::providers::{MemoryStoreService, NoOpStoreService};
use crate::store::traits::StoreService;

#[cfg(feature = "redis-store")]
use crate::store::providers::RedisStoreService;

/// Internal store backend enum for zero-cost dispatch
///
/// This is an implementation detail. Consumers use `CacheStoreAdapter`.
#[derive(Debug, Clone)]
enum StoreBackend {
    /// Redis store provider (boxed to reduce enum size)
    #[cfg(feature = "redis-store")]
    Redis(Box<RedisStoreService>),

    /// In-process store provider
    Memory(MemoryStoreService),

    /// No-op store provider (always miss, never write)
    NoOp(NoOpStoreService),
}

impl StoreBackend {
    fn provider_name(&self) -> &'static str {
        match self {
            #[cfg(feature = "redis-store")]
            Self::Redis(s) => s.provider_name(),
            Self::Memory(s) => s.provider_name(),
            Self::NoOp(s) => s.provider_name(),
        }
    }

    fn is_enabled(&self) -> bool {
        !matches!(self, Self::NoOp(_))
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        match self {
            #[cfg(feature = "redis-store")]
            Self::Redis(s) => s.exists(key).await,
            Self::Memory(s) => s.exists(key).await,
            Self::NoOp(s) => s.exists(key).await,
        }
    }

    async fn hash_get(&self, key: &str, field: &str) -> CacheResult<Option<String>> {
        match self {
            #[cfg(feature = "redis-store")]
            Self::Redis(s) => s.hash_get(key, field).await,
            Self::Memory(s) => s.hash_get(key, field).await,
            Self::NoOp(s) => s.hash_get(key, field).await,
        }
    }

    async fn hash_set_multi(
        &self,
        key: &str,
        fields: &[(String, String)],
        ttl_seconds: u64,
    ) -> CacheResult<bool> {
        match self {
            #[cfg(feature = "redis-store")]
            Self::Redis(s) => s.hash_set_multi(key, fields, ttl_seconds).await,
            Self::Memory(s) => s.hash_set_multi(key, fields, ttl_seconds).await,
            Self::NoOp(s) => s.hash_set_multi(key, fields, ttl_seconds).await,
        }
    }

    async fn list_append(&self, key: &str, values: &[String]) -> CacheResult<u64> {
        match self {
            #[cfg(feature = "redis-store")]
            Self::Redis(s) => s.list_append(key, values).await,
            Self::Memory(s) => s.list_append(key, values).await,
            Self::NoOp(s) => s.list_append(key, values).await,
        }
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> CacheResult<bool> {
        match self {
            #[cfg(feature = "redis-store")]
            Self::Redis(s) => s.expire(key, ttl_seconds).await,
            Self::Memory(s) => s.expire(key, ttl_seconds).await,
            Self::NoOp(s) => s.expire(key, ttl_seconds).await,
        }
    }

    async fn ttl(&self, key: &str) -> CacheResult<Option<u64>> {
        match self {
            #[cfg(feature = "redis-store")]
            Self::Redis(s) => s.ttl(key).await,
            Self::Memory(s) => s.ttl(key).await,
            Self::NoOp(s) => s.ttl(key).await,
        }
    }

    async fn health_check(&self) -> CacheResult<bool> {
        match self {
            #[cfg(feature = "redis-store")]
            Self::Redis(s) => s.health_check().await,
            Self::Memory(s) => s.health_check().await,
            Self::NoOp(s) => s.health_check().await,
        }
    }
}

/// Thin client over a hash/list-capable key-value store
///
/// Owns key normalization and backend dispatch. Cloning is cheap and clones
/// share the underlying connection/state.
#[derive(Debug, Clone)]
pub struct CacheStoreAdapter {
    backend: StoreBackend,
    key_prefix: String,
    encode_keys: bool,
}

impl CacheStoreAdapter {
    /// Create a store adapter from configuration with graceful degradation
    ///
    /// If Redis is configured but fails to connect, logs a warning and
    /// returns a NoOp adapter instead. The enclosing application never fails
    /// to start over cache issues.
    pub async fn from_config_graceful(config: &StoreConfig) -> Self {
        let backend = Self::create_backend(config).await;

        Self {
            backend,
            key_prefix: config.key_prefix.clone(),
            encode_keys: config.encode_keys,
        }
    }

    /// Create the store backend from configuration
    async fn create_backend(config: &StoreConfig) -> StoreBackend {
        if !config.enabled {
            info!("Response cache disabled by configuration");
            return StoreBackend::NoOp(NoOpStoreService::new());
        }

        match config.backend.as_str() {
            "redis" => Self::create_redis_backend(config).await,
            "memory" | "in-memory" => StoreBackend::Memory(MemoryStoreService::new()),
            other => {
                warn!(backend = other, "Unknown store backend, falling back to NoOp");
                StoreBackend::NoOp(NoOpStoreService::new())
            }
        }
    }

    /// Attempt to create a Redis backend, falling back to NoOp on failure
    #[cfg(feature = "redis-store")]
    async fn create_redis_backend(config: &StoreConfig) -> StoreBackend {
        match RedisStoreService::from_config(config).await {
            Ok(service) => {
                info!(backend = "redis", "Store adapter initialized successfully");
                StoreBackend::Redis(Box::new(service))
            }
            Err(e) => {
                warn!(
                    error = %e,
                    "Failed to connect to Redis, falling back to NoOp store (graceful degradation)"
                );
                StoreBackend::NoOp(NoOpStoreService::new())
            }
        }
    }

    /// Fallback when the redis-store feature is not enabled
    #[cfg(not(feature = "redis-store"))]
    async fn create_redis_backend(_config: &StoreConfig) -> StoreBackend {
        warn!("Redis store backend requested but 'redis-store' feature not enabled, using NoOp");
        StoreBackend::NoOp(NoOpStoreService::new())
    }

    /// Create an adapter over a caller-supplied memory store
    ///
    /// The caller keeps its own clone of the service, which shares state
    /// with the adapter — handy for inspecting writes in tests.
    pub fn memory(service: MemoryStoreService, config: &StoreConfig) -> Self {
        Self {
            backend: StoreBackend::Memory(service),
            key_prefix: config.key_prefix.clone(),
            encode_keys: config.encode_keys,
        }
    }

    /// Create a NoOp adapter (for explicit opt-out or testing)
    pub fn noop() -> Self {
        Self {
            backend: StoreBackend::NoOp(NoOpStoreService::new()),
            key_prefix: String::new(),
            encode_keys: false,
        }
    }

    /// Check if caching is actually enabled (not NoOp)
    pub fn is_enabled(&self) -> bool {
        self.backend.is_enabled()
    }

    /// Get the provider name
    pub fn provider_name(&self) -> &'static str {
        self.backend.provider_name()
    }

    /// Normalize a raw cache key for the wire
    ///
    /// Derived keys embed request JSON and can grow without bound; encode
    /// mode digests them to a fixed width. The digest is stable, so external
    /// invalidation tooling can rebuild the same wire keys.
    pub fn build_key(&self, key: &str) -> String {
        if self.encode_keys {
            format!("{}{:x}", self.key_prefix, md5::compute(key))
        } else {
            format!("{}{}", self.key_prefix, key)
        }
    }

    /// Check whether a raw key exists
    pub async fn exists(&self, key: &str) -> CacheResult<bool> {
        self.backend.exists(&self.build_key(key)).await
    }

    /// Get one field from the hash at a raw key
    pub async fn hash_get(&self, key: &str, field: &str) -> CacheResult<Option<String>> {
        self.backend.hash_get(&self.build_key(key), field).await
    }

    /// Set all fields on the hash at a raw key, then its TTL
    ///
    /// Returns `Ok(false)` if either step fails — partial success is treated
    /// as failure so a hash is never left unexpiring.
    pub async fn hash_set_multi(
        &self,
        key: &str,
        fields: &[(String, String)],
        ttl_seconds: u64,
    ) -> CacheResult<bool> {
        self.backend
            .hash_set_multi(&self.build_key(key), fields, ttl_seconds)
            .await
    }

    /// Append values to the list at a raw key
    pub async fn list_append(&self, key: &str, values: &[String]) -> CacheResult<u64> {
        self.backend.list_append(&self.build_key(key), values).await
    }

    /// Set the TTL on a raw key
    pub async fn expire(&self, key: &str, ttl_seconds: u64) -> CacheResult<bool> {
        self.backend.expire(&self.build_key(key), ttl_seconds).await
    }

    /// Remaining TTL on a raw key
    pub async fn ttl(&self, key: &str) -> CacheResult<Option<u64>> {
        self.backend.ttl(&self.build_key(key)).await
    }

    /// Health check the store backend
    pub async fn health_check(&self) -> CacheResult<bool> {
        let healthy = self.backend.health_check().await?;
        debug!(provider = self.provider_name(), healthy = healthy, "Store health check");
        Ok(healthy)
    }
}
