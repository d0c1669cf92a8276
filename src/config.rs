//! Configuration for the backing store and the model layer seam.
//!
//! Both structs deserialize from application configuration and carry
//! `Default` impls so tests and single-purpose tools can construct them
//! inline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::keys::KeyTemplates;

/// Backing store configuration
///
/// `backend` selects the provider: `"redis"` for a shared store, `"memory"`
/// for an in-process store, anything else falls back to NoOp with a warning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub enabled: bool,
    pub backend: String,
    /// Redis connection URL, e.g. `redis://127.0.0.1:6379/0`
    pub url: String,
    /// Namespace prepended to every normalized key
    pub key_prefix: String,
    /// When true, raw keys are md5-digested before prefixing so arbitrarily
    /// long derived keys stay fixed-width on the wire
    pub encode_keys: bool,
    pub connection_timeout_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: "redis".to_string(),
            url: "redis://127.0.0.1:6379/0".to_string(),
            key_prefix: String::new(),
            encode_keys: true,
            connection_timeout_seconds: 10,
        }
    }
}

impl StoreConfig {
    /// Get connection timeout as Duration
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_seconds)
    }
}

/// Per-model cache settings supplied by the model layer
///
/// `class_name` names the invalidation scope family for this model; `::`
/// path separators are normalized to the key delimiter when scopes are
/// formed, so `app::models::Article` and `app:models:Article` are the same
/// scope family.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelCacheSettings {
    pub class_name: String,
    /// API endpoint name, substituted for the `{endpoint}` macro
    pub endpoint: String,
    /// Default cache duration (seconds) when a call supplies no override
    pub cache_duration: u64,
    /// Request params never included in param-aware key suffixes
    pub blacklisted_cache_params: Vec<String>,
    /// Request headers never included in header-aware key suffixes
    pub blacklisted_cache_headers: Vec<String>,
    /// Honored by the attribute-mapping layer, carried here because the
    /// model layer hands the cache the same config map
    pub allow_null_values: bool,
    pub key_templates: KeyTemplates,
}

impl Default for ModelCacheSettings {
    fn default() -> Self {
        Self {
            class_name: String::new(),
            endpoint: String::new(),
            cache_duration: 300,
            blacklisted_cache_params: Vec::new(),
            blacklisted_cache_headers: Vec::new(),
            allow_null_values: false,
            key_templates: KeyTemplates::default(),
        }
    }
}
