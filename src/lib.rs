//! # restcache
//!
//! Client-side response caching for REST API clients, backed by a hash/list
//! key-value store (Redis, or an in-process store for tests and
//! single-instance deployments).
//!
//! The crate sits between an API-client model layer and the store and
//! provides cache-aside semantics for read responses:
//!
//! - **Key derivation** ([`keys`]) — deterministic keys from per-kind
//!   templates, `{id}`/`{endpoint}` macros, and order-preserving
//!   param/header-aware suffixes with blacklist filtering.
//! - **Response cache** ([`response`]) — per-call plan resolution
//!   (`cache(directive)`), the get-from-cache / store-to-cache cycle, and
//!   the resource vs. collection entry formats.
//! - **Master key index** ([`master_keys`]) — per-scope lists of dependent
//!   cache keys for hierarchical invalidation, with TTL backoff.
//! - **Store layer** ([`store`]) — key normalization and enum-dispatched
//!   providers with graceful degradation to a no-op store.
//!
//! ## Example
//!
//! ```no_run
//! use restcache::config::{ModelCacheSettings, StoreConfig};
//! use restcache::request::RequestOptions;
//! use restcache::response::{ResponseCache, StorePayload};
//! use restcache::store::CacheStoreAdapter;
//!
//! # async fn example() {
//! let adapter = CacheStoreAdapter::from_config_graceful(&StoreConfig::default()).await;
//! let settings = ModelCacheSettings {
//!     class_name: "app::models::Article".to_string(),
//!     endpoint: "articles".to_string(),
//!     ..ModelCacheSettings::default()
//! };
//!
//! let mut cache = ResponseCache::new(adapter, settings);
//! cache.set_resource_id(Some("42".to_string()));
//!
//! cache.cache(true);
//! cache.configure_for_request(RequestOptions::get("/articles/42", "resource"));
//!
//! if let Some(body) = cache.get_from_cache().await {
//!     // serve the cached body
//! } else {
//!     let body = String::from("{\"id\":42}"); // fetched upstream
//!     cache.store_to_cache(StorePayload::response(body)).await;
//! }
//! # }
//! ```

pub mod config;
pub mod errors;
pub mod keys;
pub mod logging;
pub mod master_keys;
pub mod request;
pub mod response;
pub mod store;

pub use config::{ModelCacheSettings, StoreConfig};
pub use errors::{CacheError, CacheResult};
pub use keys::{CacheKind, EntryKind, KeyBuilder, KeyTemplates};
pub use master_keys::{IndexUpdate, MasterKeyIndex};
pub use request::{OrderedMap, RequestOptions};
pub use response::{
    CacheDirective, CacheOverrides, CachePlan, CollectionMember, ResponseCache, StorePayload,
};
pub use store::CacheStoreAdapter;
