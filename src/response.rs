//! Response cache orchestration: per-call plan resolution, cache-aside reads
//! and entry storage.
//!
//! A `ResponseCache` lives alongside one model instance and carries the
//! transient state of a single logical operation: configure a plan, derive
//! the key for the incoming request, try the cache, and (on miss) store the
//! fetched response. The active plan is archived as the previous plan and
//! all transient state resets after every store, so plans never leak across
//! operations.

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ModelCacheSettings;
use crate::keys::{CacheKind, EntryKind, KeyBuilder};
use crate::master_keys::{IndexUpdate, MasterKeyIndex};
use crate::request::{OrderedMap, RequestOptions};
use crate::store::CacheStoreAdapter;

const TYPE_FIELD: &str = "type";
const DATA_FIELD: &str = "data";
const KEYS_FIELD: &str = "keys";

/// One operation's cache plan
///
/// Created fresh per logical operation, mutated during key resolution, and
/// archived as the previous plan once the operation completes.
#[derive(Debug, Clone)]
pub struct CachePlan {
    pub kind: CacheKind,
    /// Explicit key override; once the request is configured, also holds the
    /// derived key
    pub key: Option<String>,
    /// Concrete kind after resolution against the request
    pub resolved_kind: Option<EntryKind>,
    /// Entry TTL in seconds
    pub duration: u64,
    pub param_aware: bool,
    pub header_aware: bool,
    /// Register the entry under the class-wide invalidation scope instead of
    /// per-resource scopes
    pub global_key: bool,
    pub cache_empty_responses: bool,
}

impl CachePlan {
    /// The default plan for a model: auto kind, param-aware, model-level TTL
    pub fn with_defaults(settings: &ModelCacheSettings) -> Self {
        Self {
            kind: CacheKind::Auto,
            key: None,
            resolved_kind: None,
            duration: settings.cache_duration,
            param_aware: true,
            header_aware: false,
            global_key: false,
            cache_empty_responses: false,
        }
    }

    fn apply(mut self, overrides: CacheOverrides) -> Self {
        if let Some(kind) = overrides.kind {
            self.kind = kind;
        }
        if let Some(key) = overrides.key {
            self.key = Some(key);
        }
        if let Some(duration) = overrides.duration {
            self.duration = duration;
        }
        if let Some(param_aware) = overrides.param_aware {
            self.param_aware = param_aware;
        }
        if let Some(header_aware) = overrides.header_aware {
            self.header_aware = header_aware;
        }
        if let Some(global_key) = overrides.global_key {
            self.global_key = global_key;
        }
        if let Some(cache_empty_responses) = overrides.cache_empty_responses {
            self.cache_empty_responses = cache_empty_responses;
        }
        self
    }
}

/// Caller-supplied plan overrides, merged over the model's defaults
#[derive(Debug, Clone, Default)]
pub struct CacheOverrides {
    pub kind: Option<CacheKind>,
    pub key: Option<String>,
    pub duration: Option<u64>,
    pub param_aware: Option<bool>,
    pub header_aware: Option<bool>,
    pub global_key: Option<bool>,
    pub cache_empty_responses: Option<bool>,
}

/// How a caller asks for caching on one operation
#[derive(Debug, Clone)]
pub enum CacheDirective {
    Disabled,
    Defaults,
    Overrides(CacheOverrides),
}

impl From<bool> for CacheDirective {
    fn from(enabled: bool) -> Self {
        if enabled {
            Self::Defaults
        } else {
            Self::Disabled
        }
    }
}

impl From<CacheOverrides> for CacheDirective {
    fn from(overrides: CacheOverrides) -> Self {
        Self::Overrides(overrides)
    }
}

/// A collection member as seen by the store path
///
/// A member carrying its own cache key contributes that key to the entry's
/// `keys` field; otherwise the key is derived from the resource template.
#[derive(Debug, Clone)]
pub struct CollectionMember {
    pub id: String,
    pub key: Option<String>,
}

impl CollectionMember {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: None,
        }
    }
}

/// What gets handed to `store_to_cache` after a successful upstream fetch
#[derive(Debug, Clone, Default)]
pub struct StorePayload {
    /// Raw upstream response body, stored verbatim
    pub response: Option<String>,
    /// Fetched members, for collection entries
    pub collection: Vec<CollectionMember>,
}

impl StorePayload {
    pub fn response(body: impl Into<String>) -> Self {
        Self {
            response: Some(body.into()),
            collection: Vec::new(),
        }
    }
}

/// Cache-aside orchestrator for one model instance
///
/// Holds per-call mutable state; every state-transitioning operation takes
/// `&mut self`. Scope one value per call or request context, never share one
/// across in-flight operations.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    adapter: CacheStoreAdapter,
    settings: ModelCacheSettings,
    index: MasterKeyIndex,
    resource_id: Option<String>,
    plan: Option<CachePlan>,
    previous_plan: Option<CachePlan>,
    request: Option<RequestOptions>,
    found_in_cache: bool,
}

impl ResponseCache {
    pub fn new(adapter: CacheStoreAdapter, settings: ModelCacheSettings) -> Self {
        let index = MasterKeyIndex::new(adapter.clone(), settings.class_name.clone());
        Self {
            adapter,
            settings,
            index,
            resource_id: None,
            plan: None,
            previous_plan: None,
            request: None,
            found_in_cache: false,
        }
    }

    /// Set the factor by which invalidation scope lists outlive their entries
    pub fn with_backoff_factor(mut self, factor: u64) -> Self {
        self.index = self.index.with_backoff_factor(factor);
        self
    }

    /// Set (or clear) the owning resource's id
    ///
    /// The id feeds the `{id}` key macro and the resource invalidation
    /// scope. It becomes known only after a fetch for unsaved resources.
    pub fn set_resource_id(&mut self, id: Option<String>) {
        self.resource_id = id;
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    /// Begin a new operation with the given cache directive
    ///
    /// Archives the prior plan and clears all transient state first, then
    /// installs the new plan (or none, for `Disabled`).
    pub fn cache(&mut self, directive: impl Into<CacheDirective>) {
        self.reset_state();
        self.plan = match directive.into() {
            CacheDirective::Disabled => None,
            CacheDirective::Defaults => Some(CachePlan::with_defaults(&self.settings)),
            CacheDirective::Overrides(overrides) => {
                Some(CachePlan::with_defaults(&self.settings).apply(overrides))
            }
        };
    }

    /// Resolve the active plan's key and kind against an incoming request
    ///
    /// No-op on the plan when caching is disabled; the request snapshot is
    /// retained either way. Key derivation failure leaves the plan keyless,
    /// which downgrades the operation to uncached.
    pub fn configure_for_request(&mut self, options: RequestOptions) {
        if let Some(plan) = self.plan.as_mut() {
            let builder = KeyBuilder::new(&self.settings, self.resource_id.as_deref());
            match builder.generate(plan, &options) {
                Ok(key) => plan.key = Some(key),
                Err(e) => {
                    debug!(error = %e, "Cache key derivation failed, operation will not cache");
                    plan.key = None;
                }
            }
            plan.resolved_kind = plan.kind.resolve(&options).ok();
        }
        self.request = Some(options);
    }

    /// Whether the current operation can read from / write to the cache
    pub fn should_use_cache(&self) -> bool {
        self.adapter.is_enabled()
            && self
                .plan
                .as_ref()
                .is_some_and(|plan| plan.key.is_some() && plan.resolved_kind.is_some())
            && self.request.as_ref().is_some_and(RequestOptions::is_get)
    }

    /// Try the cache for the current operation's key
    ///
    /// Returns the raw stored body on a hit and marks the operation as
    /// cache-served. `None` means absent; a cached body that is itself empty
    /// still comes back as `Some`. Store failures degrade to a miss.
    pub async fn get_from_cache(&mut self) -> Option<String> {
        if !self.should_use_cache() {
            return None;
        }
        let key = self.plan.as_ref()?.key.clone()?;

        match self.adapter.exists(&key).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(key = %key, "Cache MISS");
                return None;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache existence check failed, treating as miss");
                return None;
            }
        }

        match self.adapter.hash_get(&key, DATA_FIELD).await {
            Ok(Some(data)) => {
                debug!(key = %key, "Cache HIT");
                self.found_in_cache = true;
                Some(data)
            }
            Ok(None) => {
                debug!(key = %key, "Cache entry has no data field, treating as miss");
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Store a fetched response under the current operation's key
    ///
    /// Skipped (returning false) when the operation cannot cache, when the
    /// response was itself served from the cache, or when validation fails.
    /// On success the master key index is updated. Transient state resets
    /// afterward either way.
    pub async fn store_to_cache(&mut self, payload: StorePayload) -> bool {
        let stored = self.try_store(payload).await;
        self.reset_state();
        stored
    }

    async fn try_store(&mut self, payload: StorePayload) -> bool {
        if !self.should_use_cache() || self.found_in_cache {
            return false;
        }
        let Some(plan) = self.plan.as_ref() else {
            return false;
        };
        let (Some(key), Some(kind)) = (plan.key.clone(), plan.resolved_kind) else {
            return false;
        };

        // An empty body is never cached; the empty-responses flag relaxes
        // only the collection-members check below
        let response = payload.response.unwrap_or_default();
        if response.is_empty() {
            debug!(key = %key, "Empty response not cached");
            return false;
        }
        if kind == EntryKind::Collection
            && payload.collection.is_empty()
            && !plan.cache_empty_responses
        {
            debug!(key = %key, "Empty collection not cached");
            return false;
        }

        let mut entry = OrderedMap::new();
        entry.insert(TYPE_FIELD.to_string(), Value::from(kind.as_str()));
        entry.insert(DATA_FIELD.to_string(), Value::from(response));

        let mut member_ids = Vec::new();
        if kind == EntryKind::Collection {
            let builder = KeyBuilder::new(&self.settings, self.resource_id.as_deref());
            let member_keys: Vec<String> = payload
                .collection
                .iter()
                .map(|member| {
                    member
                        .key
                        .clone()
                        .unwrap_or_else(|| builder.member_resource_key(&member.id))
                })
                .collect();
            member_ids = payload
                .collection
                .iter()
                .map(|member| member.id.clone())
                .collect();

            let encoded = match serde_json::to_string(&member_keys) {
                Ok(encoded) => encoded,
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to encode member keys, store aborted");
                    return false;
                }
            };
            entry.insert(KEYS_FIELD.to_string(), Value::from(encoded));
        }

        // A non-scalar field aborts the whole store, never a partial hash
        let Some(fields) = flatten_fields(&entry) else {
            warn!(key = %key, "Non-scalar cache entry field, store aborted");
            return false;
        };

        match self.adapter.hash_set_multi(&key, &fields, plan.duration).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(key = %key, "Cache store rejected by provider");
                return false;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache store failed");
                return false;
            }
        }

        debug!(key = %key, kind = kind.as_str(), ttl_seconds = plan.duration, "Cache entry stored");

        self.index
            .update(IndexUpdate {
                kind,
                global_key: plan.global_key,
                key,
                duration: plan.duration,
                owner_id: self.resource_id.clone(),
                member_ids,
            })
            .await;

        true
    }

    /// Manually tag an ad-hoc dependent key onto this resource's
    /// invalidation scope
    pub async fn add_key_to_scope(&self, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        let ttl = self
            .plan
            .as_ref()
            .map(|plan| plan.duration)
            .unwrap_or(self.settings.cache_duration);
        let scope = self.index.resource_scope(self.resource_id.as_deref());
        self.index.append(&scope, key, ttl).await
    }

    /// The plan of the most recently completed operation
    pub fn previous_plan(&self) -> Option<&CachePlan> {
        self.previous_plan.as_ref()
    }

    /// Archive the active plan and clear all transient operation state
    pub fn reset_state(&mut self) {
        self.previous_plan = self.plan.take();
        self.request = None;
        self.found_in_cache = false;
    }
}

/// Flatten an entry map to hash field/value pairs
///
/// Only scalar values (strings and integers) are representable; any other
/// value aborts the flatten entirely.
fn flatten_fields(entry: &OrderedMap) -> Option<Vec<(String, String)>> {
    let mut fields = Vec::with_capacity(entry.len());
    for (name, value) in entry {
        let rendered = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
            _ => return None,
        };
        fields.push((name.clone(), rendered));
    }
    Some(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::store::{MemoryStoreService, StoreService};

    fn article_settings() -> ModelCacheSettings {
        ModelCacheSettings {
            class_name: "Article".to_string(),
            endpoint: "foo".to_string(),
            ..ModelCacheSettings::default()
        }
    }

    fn memory_cache() -> (ResponseCache, MemoryStoreService) {
        let service = MemoryStoreService::new();
        let config = StoreConfig {
            backend: "memory".to_string(),
            encode_keys: false,
            ..StoreConfig::default()
        };
        let adapter = CacheStoreAdapter::memory(service.clone(), &config);
        (ResponseCache::new(adapter, article_settings()), service)
    }

    #[test]
    fn plan_defaults_follow_model_settings() {
        let plan = CachePlan::with_defaults(&article_settings());
        assert_eq!(plan.kind, CacheKind::Auto);
        assert_eq!(plan.duration, 300);
        assert!(plan.param_aware);
        assert!(!plan.header_aware);
        assert!(!plan.global_key);
        assert!(!plan.cache_empty_responses);
    }

    #[test]
    fn overrides_merge_over_defaults() {
        let plan = CachePlan::with_defaults(&article_settings()).apply(CacheOverrides {
            duration: Some(60),
            header_aware: Some(true),
            ..CacheOverrides::default()
        });
        assert_eq!(plan.duration, 60);
        assert!(plan.header_aware);
        // Untouched fields keep their defaults
        assert!(plan.param_aware);
    }

    #[test]
    fn bool_directive_maps_to_defaults_or_disabled() {
        assert!(matches!(CacheDirective::from(true), CacheDirective::Defaults));
        assert!(matches!(CacheDirective::from(false), CacheDirective::Disabled));
    }

    #[test]
    fn disabled_directive_clears_the_plan() {
        let (mut cache, _) = memory_cache();
        cache.cache(true);
        cache.configure_for_request(RequestOptions::get("/foo", "collection"));
        assert!(cache.should_use_cache());

        cache.cache(false);
        cache.configure_for_request(RequestOptions::get("/foo", "collection"));
        assert!(!cache.should_use_cache());
    }

    #[test]
    fn should_use_cache_requires_get() {
        let (mut cache, _) = memory_cache();
        cache.cache(true);
        let mut options = RequestOptions::get("/foo", "collection");
        options.method = "POST".to_string();
        cache.configure_for_request(options);
        assert!(!cache.should_use_cache());
    }

    #[test]
    fn unresolvable_kind_downgrades_to_uncached() {
        let (mut cache, _) = memory_cache();
        cache.cache(true);
        let mut options = RequestOptions::get("/foo", "collection");
        options.route_type = None;
        cache.configure_for_request(options);
        assert!(!cache.should_use_cache());
    }

    #[test]
    fn cache_archives_the_prior_plan() {
        let (mut cache, _) = memory_cache();
        cache.cache(CacheOverrides {
            duration: Some(60),
            ..CacheOverrides::default()
        });
        cache.cache(true);

        let previous = cache.previous_plan().unwrap();
        assert_eq!(previous.duration, 60);
    }

    #[tokio::test]
    async fn store_guard_rejects_cache_served_responses() {
        let (mut cache, _) = memory_cache();
        cache.set_resource_id(Some("42".to_string()));

        cache.cache(true);
        cache.configure_for_request(RequestOptions::get("/foo/42", "resource"));
        assert!(cache.store_to_cache(StorePayload::response("X")).await);

        cache.cache(true);
        cache.configure_for_request(RequestOptions::get("/foo/42", "resource"));
        assert_eq!(cache.get_from_cache().await, Some("X".to_string()));
        // Round-tripping a cache hit back into the store is a no-op
        assert!(!cache.store_to_cache(StorePayload::response("X")).await);
    }

    #[tokio::test]
    async fn store_resets_transient_state() {
        let (mut cache, _) = memory_cache();
        cache.set_resource_id(Some("42".to_string()));
        cache.cache(true);
        cache.configure_for_request(RequestOptions::get("/foo/42", "resource"));

        assert!(cache.store_to_cache(StorePayload::response("X")).await);
        assert!(!cache.should_use_cache());
        assert!(cache.previous_plan().is_some());
    }

    #[tokio::test]
    async fn empty_response_is_not_cached() {
        let (mut cache, service) = memory_cache();
        cache.set_resource_id(Some("42".to_string()));
        cache.cache(true);
        cache.configure_for_request(RequestOptions::get("/foo/42", "resource"));

        assert!(!cache.store_to_cache(StorePayload::default()).await);
        assert!(!service.exists("foo:42").await.unwrap());
    }

    #[tokio::test]
    async fn empty_response_is_not_cached_even_when_empty_responses_are_permitted() {
        let (mut cache, service) = memory_cache();
        cache.set_resource_id(Some("42".to_string()));
        cache.cache(CacheOverrides {
            cache_empty_responses: Some(true),
            ..CacheOverrides::default()
        });
        cache.configure_for_request(RequestOptions::get("/foo/42", "resource"));

        // The flag permits empty collections, never an empty body
        assert!(!cache.store_to_cache(StorePayload::response("")).await);
        assert!(!service.exists("foo:42").await.unwrap());
    }

    #[tokio::test]
    async fn collection_entry_carries_member_keys() {
        let (mut cache, service) = memory_cache();
        cache.cache(true);
        cache.configure_for_request(RequestOptions::get("/foo", "collection"));

        let payload = StorePayload {
            response: Some("[{},{}]".to_string()),
            collection: vec![
                CollectionMember::new("1"),
                CollectionMember {
                    id: "2".to_string(),
                    key: Some("custom:2".to_string()),
                },
            ],
        };
        assert!(cache.store_to_cache(payload).await);

        assert_eq!(
            service.hash_get("foo", "type").await.unwrap(),
            Some("collection".to_string())
        );
        assert_eq!(
            service.hash_get("foo", "keys").await.unwrap(),
            Some("[\"foo:1\",\"custom:2\"]".to_string())
        );
        // Each member lands in its own invalidation scope
        assert!(service.exists("Article:1").await.unwrap());
        assert!(service.exists("Article:2").await.unwrap());
    }

    #[tokio::test]
    async fn add_key_to_scope_rejects_empty_keys() {
        let (cache, _) = memory_cache();
        assert!(!cache.add_key_to_scope("").await);
    }

    #[tokio::test]
    async fn add_key_to_scope_appends_to_owner_scope() {
        let (mut cache, service) = memory_cache();
        cache.set_resource_id(Some("42".to_string()));

        assert!(cache.add_key_to_scope("related:listing").await);
        assert!(service.exists("Article:42").await.unwrap());
    }

    #[test]
    fn flatten_renders_scalars_only() {
        let mut entry = OrderedMap::new();
        entry.insert("type".to_string(), Value::from("resource"));
        entry.insert("count".to_string(), Value::from(3));

        let fields = flatten_fields(&entry).unwrap();
        assert_eq!(
            fields,
            vec![
                ("type".to_string(), "resource".to_string()),
                ("count".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn flatten_aborts_on_nested_values() {
        let mut entry = OrderedMap::new();
        entry.insert("type".to_string(), Value::from("resource"));
        entry.insert("data".to_string(), serde_json::json!({"nested": true}));

        assert_eq!(flatten_fields(&entry), None);
    }
}
