//! Store service trait definition

use crate::errors::CacheResult;

/// Trait defining the hash/list operations the cache layer needs from a
/// key-value store
///
/// Implemented by concrete store providers (Redis, Memory, NoOp). Keys
/// arriving here are already normalized (digested and prefixed) by the
/// adapter. All operations are async and return `CacheResult` for error
/// handling.
pub trait StoreService: Send + Sync {
    /// Check whether a key exists
    fn exists(&self, key: &str) -> impl std::future::Future<Output = CacheResult<bool>> + Send;

    /// Get one field from a hash
    ///
    /// Returns `Ok(None)` when the key or field is absent.
    fn hash_get(
        &self,
        key: &str,
        field: &str,
    ) -> impl std::future::Future<Output = CacheResult<Option<String>>> + Send;

    /// Set all fields on a hash, then set the hash's TTL
    ///
    /// Returns `Ok(false)` if either step fails; partial success is failure.
    fn hash_set_multi(
        &self,
        key: &str,
        fields: &[(String, String)],
        ttl_seconds: u64,
    ) -> impl std::future::Future<Output = CacheResult<bool>> + Send;

    /// Append values to the tail of a list, returning the post-append length
    fn list_append(
        &self,
        key: &str,
        values: &[String],
    ) -> impl std::future::Future<Output = CacheResult<u64>> + Send;

    /// Set a key's TTL
    ///
    /// Returns `Ok(false)` when the key does not exist.
    fn expire(
        &self,
        key: &str,
        ttl_seconds: u64,
    ) -> impl std::future::Future<Output = CacheResult<bool>> + Send;

    /// Remaining TTL for a key, `None` when the key is absent or has no TTL
    fn ttl(&self, key: &str)
        -> impl std::future::Future<Output = CacheResult<Option<u64>>> + Send;

    /// Check if the store backend is healthy
    fn health_check(&self) -> impl std::future::Future<Output = CacheResult<bool>> + Send;

    /// Get the name of the store provider
    fn provider_name(&self) -> &'static str;
}
