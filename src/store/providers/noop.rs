//! No-op store provider
//!
//! Always misses, never writes. Used when caching is disabled or when the
//! configured backend is unreachable (graceful degradation).

use crate::errors::CacheResult;
use crate::store::traits::StoreService;

/// No-op store service that never stores anything
///
/// All reads report absence, all writes report failure without side effects,
/// so callers treat every operation as an ordinary miss.
#[derive(Debug, Clone, Default)]
pub struct NoOpStoreService;

impl NoOpStoreService {
    /// Create a new no-op store service
    pub fn new() -> Self {
        Self
    }
}

impl StoreService for NoOpStoreService {
    async fn exists(&self, _key: &str) -> CacheResult<bool> {
        Ok(false)
    }

    async fn hash_get(&self, _key: &str, _field: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn hash_set_multi(
        &self,
        _key: &str,
        _fields: &[(String, String)],
        _ttl_seconds: u64,
    ) -> CacheResult<bool> {
        Ok(false)
    }

    async fn list_append(&self, _key: &str, _values: &[String]) -> CacheResult<u64> {
        Ok(0)
    }

    async fn expire(&self, _key: &str, _ttl_seconds: u64) -> CacheResult<bool> {
        Ok(false)
    }

    async fn ttl(&self, _key: &str) -> CacheResult<Option<u64>> {
        Ok(None)
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "noop"
    }
}
