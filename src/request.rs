//! Request options consumed from the external request pipeline.
//!
//! Params and headers are ordered maps: the caller-supplied insertion order
//! flows byte-for-byte into derived cache keys, so two requests built the
//! same way always derive the same key.

use indexmap::IndexMap;
use serde_json::Value;

/// Ordered key/value map used for request params and headers
pub type OrderedMap = IndexMap<String, Value>;

/// One request's worth of options, supplied by the request pipeline and
/// consumed once per logical operation
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: String,
    pub route: String,
    /// Route type declared by the route table, used for "auto" kind
    /// resolution (`resource`, `collection`)
    pub route_type: Option<String>,
    pub params: OrderedMap,
    pub headers: OrderedMap,
    pub data: Option<Value>,
}

impl RequestOptions {
    /// Build options for a GET request against a typed route
    pub fn get(route: impl Into<String>, route_type: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            route: route.into(),
            route_type: Some(route_type.into()),
            ..Self::default()
        }
    }

    pub fn with_params(mut self, params: OrderedMap) -> Self {
        self.params = params;
        self
    }

    pub fn with_headers(mut self, headers: OrderedMap) -> Self {
        self.headers = headers;
        self
    }

    /// Whether this request is a cacheable read (method comparison is ASCII
    /// case-insensitive)
    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}
