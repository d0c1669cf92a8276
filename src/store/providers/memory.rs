//! In-process store provider
//!
//! Backs the same hash/list surface as Redis with a deadline-expiring map.
//! Useful for tests and single-instance deployments without store
//! infrastructure.
//!
//! **Important**: this store is NOT distributed. Each process maintains its
//! own state, so invalidation driven from another process will not reach it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::debug;

use crate::errors::{CacheError, CacheResult};
use crate::store::traits::StoreService;

enum StoredValue {
    Hash(HashMap<String, String>),
    List(Vec<String>),
}

struct Entry {
    value: StoredValue,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// In-memory store service
///
/// Clones share state, so a test can keep a handle while the adapter owns
/// another. Expired entries are dropped lazily on access.
#[derive(Clone, Default)]
pub struct MemoryStoreService {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl std::fmt::Debug for MemoryStoreService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStoreService")
            .field("entries", &self.entries.read().len())
            .finish()
    }
}

impl MemoryStoreService {
    /// Create a new empty memory store service
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the entry if it has expired, returning whether a live entry
    /// remains
    fn purge_expired(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.write();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }
}

impl StoreService for MemoryStoreService {
    async fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.purge_expired(key))
    }

    async fn hash_get(&self, key: &str, field: &str) -> CacheResult<Option<String>> {
        if !self.purge_expired(key) {
            return Ok(None);
        }

        let entries = self.entries.read();
        let result = match entries.get(key).map(|entry| &entry.value) {
            Some(StoredValue::Hash(fields)) => fields.get(field).cloned(),
            _ => None,
        };

        Ok(result)
    }

    async fn hash_set_multi(
        &self,
        key: &str,
        fields: &[(String, String)],
        ttl_seconds: u64,
    ) -> CacheResult<bool> {
        if fields.is_empty() {
            return Ok(false);
        }

        let mut entries = self.entries.write();
        let hash = fields.iter().cloned().collect::<HashMap<_, _>>();
        entries.insert(
            key.to_string(),
            Entry {
                value: StoredValue::Hash(hash),
                expires_at: Some(Instant::now() + Duration::from_secs(ttl_seconds)),
            },
        );

        debug!(key = key, fields = fields.len(), ttl_seconds = ttl_seconds, "Cache HSET (memory)");
        Ok(true)
    }

    async fn list_append(&self, key: &str, values: &[String]) -> CacheResult<u64> {
        self.purge_expired(key);

        let mut entries = self.entries.write();
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: StoredValue::List(Vec::new()),
            expires_at: None,
        });

        match &mut entry.value {
            StoredValue::List(list) => {
                list.extend(values.iter().cloned());
                Ok(list.len() as u64)
            }
            // Wrong-type on an existing key errors, as Redis WRONGTYPE would
            StoredValue::Hash(_) => Err(CacheError::BackendError(format!(
                "key {key} holds a hash, not a list"
            ))),
        }
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> CacheResult<bool> {
        if !self.purge_expired(key) {
            return Ok(false);
        }

        let mut entries = self.entries.write();
        match entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at = Some(Instant::now() + Duration::from_secs(ttl_seconds));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> CacheResult<Option<u64>> {
        if !self.purge_expired(key) {
            return Ok(None);
        }

        let entries = self.entries.read();
        let remaining = entries.get(key).and_then(|entry| entry.expires_at).map(
            |deadline| {
                deadline
                    .saturating_duration_since(Instant::now())
                    .as_secs_f64()
                    .ceil() as u64
            },
        );

        Ok(remaining)
    }

    async fn health_check(&self) -> CacheResult<bool> {
        // In-memory store is always healthy
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
