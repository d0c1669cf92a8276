//! Master key lists: the per-scope invalidation index.
//!
//! Every stored cache entry registers its key under one or more invalidation
//! scopes — `{class}:{id}` for a resource, `{class}:{member_id}` for each
//! member of a collection, `{class}:*` for class-wide entries. An external
//! invalidation service reads a scope's list and deletes every key in it;
//! this subsystem only ever appends.
//!
//! Appends extend the scope list's own TTL to `ttl × backoff_factor` so the
//! index outlives the newest entry it references while still expiring
//! eventually. Duplicate appends are tolerated; delete-by-value downstream is
//! idempotent.

use tracing::{debug, warn};

use crate::keys::{EntryKind, KEY_DELIMITER};
use crate::store::CacheStoreAdapter;

/// Indicator segment for class-wide (global) scopes
const GLOBAL_INDICATOR: &str = "*";

/// What the index needs to know about one successfully stored entry
#[derive(Debug, Clone)]
pub struct IndexUpdate {
    pub kind: EntryKind,
    pub global_key: bool,
    /// The stored entry's cache key (raw, pre-normalization)
    pub key: String,
    /// The stored entry's TTL in seconds
    pub duration: u64,
    /// Owning resource id, for resource-kind updates
    pub owner_id: Option<String>,
    /// Member resource ids, for collection-kind fan-out
    pub member_ids: Vec<String>,
}

/// Tracks, per invalidation scope, every cache key depending on that scope
#[derive(Debug, Clone)]
pub struct MasterKeyIndex {
    adapter: CacheStoreAdapter,
    class_name: String,
    backoff_factor: u64,
}

impl MasterKeyIndex {
    pub fn new(adapter: CacheStoreAdapter, class_name: impl Into<String>) -> Self {
        Self {
            adapter,
            class_name: class_name.into(),
            backoff_factor: 1,
        }
    }

    /// Set the factor by which scope list TTLs outlive their newest entry
    pub fn with_backoff_factor(mut self, factor: u64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// The scope family name, with `::` path separators normalized to the
    /// key delimiter
    fn scope_class(&self) -> String {
        self.class_name.replace("::", KEY_DELIMITER)
    }

    /// The class-wide scope: `{class}:*`
    pub fn global_scope(&self) -> String {
        format!("{}{}{}", self.scope_class(), KEY_DELIMITER, GLOBAL_INDICATOR)
    }

    /// A single resource's scope: `{class}:{id}`
    ///
    /// A missing id degrades to an empty segment rather than failing; the
    /// entry still lands in a well-formed (if anonymous) scope.
    pub fn resource_scope(&self, id: Option<&str>) -> String {
        format!(
            "{}{}{}",
            self.scope_class(),
            KEY_DELIMITER,
            id.unwrap_or_default()
        )
    }

    /// Register a stored entry under its invalidation scope(s)
    ///
    /// Dispatch order: global entries land in the class-wide scope
    /// regardless of kind; collections fan out to one scope per member;
    /// resources land in their owner's scope.
    pub async fn update(&self, update: IndexUpdate) -> bool {
        if update.global_key {
            return self
                .append(&self.global_scope(), &update.key, update.duration)
                .await;
        }

        match update.kind {
            EntryKind::Collection => {
                for member_id in &update.member_ids {
                    let scope = self.resource_scope(Some(member_id));
                    // Best-effort: one member's failure never aborts the rest
                    if !self.append(&scope, &update.key, update.duration).await {
                        warn!(
                            scope = %scope,
                            key = %update.key,
                            "Master key append failed for collection member, continuing"
                        );
                    }
                }
                true
            }
            EntryKind::Resource => {
                self.append(
                    &self.resource_scope(update.owner_id.as_deref()),
                    &update.key,
                    update.duration,
                )
                .await
            }
        }
    }

    /// Append a cache key to a scope's list, extending the list's TTL
    ///
    /// Returns false without attempting the append when the adapter is
    /// disabled. Store failures are logged and reported as false, never
    /// raised.
    pub async fn append(&self, scope: &str, key: &str, ttl: u64) -> bool {
        if !self.adapter.is_enabled() {
            return false;
        }

        match self.adapter.list_append(scope, &[key.to_string()]).await {
            Ok(length) => {
                debug!(scope = scope, key = key, length = length, "Master key appended");

                // A zero TTL leaves the scope list unexpiring
                if ttl > 0 {
                    let scope_ttl = ttl * self.backoff_factor;
                    if let Err(e) = self.adapter.expire(scope, scope_ttl).await {
                        warn!(scope = scope, error = %e, "Failed to extend master key list TTL");
                    }
                }

                true
            }
            Err(e) => {
                warn!(scope = scope, key = key, error = %e, "Master key append failed");
                false
            }
        }
    }
}
