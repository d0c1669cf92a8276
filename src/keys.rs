//! Cache key derivation.
//!
//! Keys come from per-kind templates (`{endpoint}:{id}` for resources,
//! `{endpoint}` for collections by default) with macros resolved by literal
//! substring replacement, then optionally suffixed with a canonical JSON
//! encoding of the request params/headers so distinct query variants never
//! collide. Blacklisted params/headers are filtered out before the suffix is
//! formed.

use serde::{Deserialize, Serialize};

use crate::config::ModelCacheSettings;
use crate::errors::{CacheError, CacheResult};
use crate::request::{OrderedMap, RequestOptions};
use crate::response::CachePlan;

/// Delimiter between cache key parts
pub(crate) const KEY_DELIMITER: &str = ":";

/// The two storable entry shapes
///
/// A closed variant: every cached hash is one of these, and `type` fields on
/// the wire hold exactly these strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Resource,
    Collection,
}

impl EntryKind {
    /// Total mapping from a declared route type to an entry kind
    ///
    /// Undeclared route types are an explicit error, never a silent sentinel.
    pub fn from_route_type(route_type: &str) -> CacheResult<Self> {
        match route_type {
            "resource" => Ok(Self::Resource),
            "collection" => Ok(Self::Collection),
            other => Err(CacheError::InvalidRouteType(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Collection => "collection",
        }
    }
}

/// Requested entry kind on a cache plan
///
/// `Auto` defers to the route type declared on the request options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheKind {
    #[default]
    Auto,
    Resource,
    Collection,
}

impl CacheKind {
    /// Resolve the requested kind against a set of request options
    pub fn resolve(&self, options: &RequestOptions) -> CacheResult<EntryKind> {
        match self {
            Self::Resource => Ok(EntryKind::Resource),
            Self::Collection => Ok(EntryKind::Collection),
            Self::Auto => {
                let route_type = options.route_type.as_deref().ok_or_else(|| {
                    CacheError::Configuration(
                        "auto cache kind requires a route_type on the request options".to_string(),
                    )
                })?;
                EntryKind::from_route_type(route_type)
            }
        }
    }
}

/// Key templates, one per entry kind
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeyTemplates {
    pub resource: String,
    pub collection: String,
}

impl Default for KeyTemplates {
    fn default() -> Self {
        Self {
            resource: "{endpoint}:{id}".to_string(),
            collection: "{endpoint}".to_string(),
        }
    }
}

impl KeyTemplates {
    pub fn for_kind(&self, kind: EntryKind) -> &str {
        match kind {
            EntryKind::Resource => &self.resource,
            EntryKind::Collection => &self.collection,
        }
    }
}

/// Derives deterministic cache keys for one model instance
///
/// Borrowed per call; holds the model's settings and the owning resource's
/// id (absent for unsaved or collection-level operations).
pub struct KeyBuilder<'a> {
    settings: &'a ModelCacheSettings,
    resource_id: Option<&'a str>,
}

impl<'a> KeyBuilder<'a> {
    pub fn new(settings: &'a ModelCacheSettings, resource_id: Option<&'a str>) -> Self {
        Self {
            settings,
            resource_id,
        }
    }

    /// The macro substitution table for this model
    ///
    /// Extensible seam: additional macros merge after these and may shadow
    /// them.
    pub fn macros(&self) -> Vec<(String, String)> {
        vec![
            (
                "{id}".to_string(),
                self.resource_id.unwrap_or_default().to_string(),
            ),
            ("{endpoint}".to_string(), self.settings.endpoint.clone()),
        ]
    }

    /// Generate the cache key for a resolved plan and request
    ///
    /// A plan-level explicit key is returned verbatim and bypasses all
    /// macro and awareness logic.
    pub fn generate(&self, plan: &CachePlan, options: &RequestOptions) -> CacheResult<String> {
        if let Some(key) = &plan.key {
            return Ok(key.clone());
        }

        let kind = plan.kind.resolve(options)?;
        let mut key = replace_macros(self.settings.key_templates.for_kind(kind), &self.macros());

        if plan.param_aware {
            let params = filter_blacklisted(&options.params, &self.settings.blacklisted_cache_params);
            key.push_str(&aware_key_part("params", &params)?);
        }

        if plan.header_aware {
            let headers =
                filter_blacklisted(&options.headers, &self.settings.blacklisted_cache_headers);
            key.push_str(&aware_key_part("headers", &headers)?);
        }

        Ok(key)
    }

    /// Generate the resource-template key for a collection member
    ///
    /// Used when storing a collection entry: each member contributes its own
    /// resource key to the entry's `keys` field. A member carrying an
    /// explicit key wins over derivation.
    pub fn member_resource_key(&self, member_id: &str) -> String {
        let mut macros = self.macros();
        for (name, value) in &mut macros {
            if name == "{id}" {
                *value = member_id.to_string();
            }
        }
        replace_macros(&self.settings.key_templates.resource, &macros)
    }
}

/// Replace macro tokens in a template by literal substring substitution
fn replace_macros(template: &str, macros: &[(String, String)]) -> String {
    let mut result = template.to_string();
    for (name, value) in macros {
        result = result.replace(name.as_str(), value);
    }
    result
}

/// Form an "aware" key part: `:{kind}:{canonical-json}`, or empty when the
/// filtered data is empty
fn aware_key_part(kind: &str, data: &OrderedMap) -> CacheResult<String> {
    if data.is_empty() {
        return Ok(String::new());
    }

    let encoded = serde_json::to_string(data)
        .map_err(|e| CacheError::SerializationError(format!("aware key part: {e}")))?;

    Ok(format!("{KEY_DELIMITER}{kind}{KEY_DELIMITER}{encoded}"))
}

/// Remove blacklisted keys before an aware key part is formed
///
/// Absent keys are simply skipped.
fn filter_blacklisted(data: &OrderedMap, blacklist: &[String]) -> OrderedMap {
    data.iter()
        .filter(|(key, _)| !blacklist.contains(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn article_settings() -> ModelCacheSettings {
        ModelCacheSettings {
            class_name: "app::models::Article".to_string(),
            endpoint: "foo".to_string(),
            ..ModelCacheSettings::default()
        }
    }

    fn resource_plan() -> CachePlan {
        CachePlan {
            kind: CacheKind::Resource,
            ..CachePlan::with_defaults(&article_settings())
        }
    }

    #[test]
    fn from_route_type_maps_declared_types() {
        assert_eq!(
            EntryKind::from_route_type("resource").unwrap(),
            EntryKind::Resource
        );
        assert_eq!(
            EntryKind::from_route_type("collection").unwrap(),
            EntryKind::Collection
        );
    }

    #[test]
    fn from_route_type_rejects_undeclared_types() {
        let err = EntryKind::from_route_type("listing").unwrap_err();
        assert!(matches!(err, CacheError::InvalidRouteType(t) if t == "listing"));
    }

    #[test]
    fn auto_kind_resolves_from_route_type() {
        let options = RequestOptions::get("/foo/42", "resource");
        assert_eq!(
            CacheKind::Auto.resolve(&options).unwrap(),
            EntryKind::Resource
        );
    }

    #[test]
    fn auto_kind_without_route_type_is_an_error() {
        let mut options = RequestOptions::get("/foo/42", "resource");
        options.route_type = None;
        assert!(matches!(
            CacheKind::Auto.resolve(&options),
            Err(CacheError::Configuration(_))
        ));
    }

    #[test]
    fn resource_key_is_deterministic() {
        let settings = article_settings();
        let builder = KeyBuilder::new(&settings, Some("42"));
        let options = RequestOptions::get("/foo/42", "resource");

        let first = builder.generate(&resource_plan(), &options).unwrap();
        let second = builder.generate(&resource_plan(), &options).unwrap();
        assert_eq!(first, "foo:42");
        assert_eq!(first, second);
    }

    #[test]
    fn param_aware_key_appends_canonical_json() {
        let settings = article_settings();
        let builder = KeyBuilder::new(&settings, Some("42"));

        let mut params = OrderedMap::new();
        params.insert("page".to_string(), Value::from(2));
        let options = RequestOptions::get("/foo/42", "resource").with_params(params);

        let key = builder.generate(&resource_plan(), &options).unwrap();
        assert_eq!(key, "foo:42:params:{\"page\":2}");
    }

    #[test]
    fn param_order_is_caller_supplied_not_alphabetical() {
        let settings = article_settings();
        let builder = KeyBuilder::new(&settings, Some("42"));

        let mut params = OrderedMap::new();
        params.insert("zebra".to_string(), Value::from(1));
        params.insert("apple".to_string(), Value::from(2));
        let options = RequestOptions::get("/foo/42", "resource").with_params(params);

        let key = builder.generate(&resource_plan(), &options).unwrap();
        assert_eq!(key, "foo:42:params:{\"zebra\":1,\"apple\":2}");
    }

    #[test]
    fn blacklisted_params_never_reach_the_key() {
        let mut settings = article_settings();
        settings.blacklisted_cache_params = vec!["token".to_string()];
        let builder = KeyBuilder::new(&settings, Some("42"));

        let mut params = OrderedMap::new();
        params.insert("token".to_string(), Value::from("secret"));
        params.insert("page".to_string(), Value::from(2));
        let options = RequestOptions::get("/foo/42", "resource").with_params(params);

        let key = builder.generate(&resource_plan(), &options).unwrap();
        assert_eq!(key, "foo:42:params:{\"page\":2}");
    }

    #[test]
    fn all_params_blacklisted_leaves_a_bare_key() {
        let mut settings = article_settings();
        settings.blacklisted_cache_params = vec!["token".to_string()];
        let builder = KeyBuilder::new(&settings, Some("42"));

        let mut params = OrderedMap::new();
        params.insert("token".to_string(), Value::from("secret"));
        let options = RequestOptions::get("/foo/42", "resource").with_params(params);

        let key = builder.generate(&resource_plan(), &options).unwrap();
        assert_eq!(key, "foo:42");
    }

    #[test]
    fn header_aware_is_off_by_default() {
        let settings = article_settings();
        let builder = KeyBuilder::new(&settings, Some("42"));

        let mut headers = OrderedMap::new();
        headers.insert("Accept".to_string(), Value::from("application/json"));
        let options = RequestOptions::get("/foo/42", "resource").with_headers(headers);

        let key = builder.generate(&resource_plan(), &options).unwrap();
        assert_eq!(key, "foo:42");
    }

    #[test]
    fn header_aware_key_appends_headers_part() {
        let settings = article_settings();
        let builder = KeyBuilder::new(&settings, Some("42"));

        let mut plan = resource_plan();
        plan.header_aware = true;

        let mut headers = OrderedMap::new();
        headers.insert("Accept".to_string(), Value::from("application/json"));
        let options = RequestOptions::get("/foo/42", "resource").with_headers(headers);

        let key = builder.generate(&plan, &options).unwrap();
        assert_eq!(key, "foo:42:headers:{\"Accept\":\"application/json\"}");
    }

    #[test]
    fn explicit_plan_key_bypasses_derivation() {
        let settings = article_settings();
        let builder = KeyBuilder::new(&settings, Some("42"));

        let mut plan = resource_plan();
        plan.key = Some("custom:key".to_string());

        let mut params = OrderedMap::new();
        params.insert("page".to_string(), Value::from(2));
        let options = RequestOptions::get("/foo/42", "resource").with_params(params);

        let key = builder.generate(&plan, &options).unwrap();
        assert_eq!(key, "custom:key");
    }

    #[test]
    fn missing_id_substitutes_empty_string() {
        let settings = article_settings();
        let builder = KeyBuilder::new(&settings, None);
        let options = RequestOptions::get("/foo", "resource");

        let key = builder.generate(&resource_plan(), &options).unwrap();
        assert_eq!(key, "foo:");
    }

    #[test]
    fn member_resource_key_substitutes_member_id() {
        let settings = article_settings();
        let builder = KeyBuilder::new(&settings, Some("42"));
        assert_eq!(builder.member_resource_key("7"), "foo:7");
    }

    #[test]
    fn collection_template_ignores_id() {
        let settings = article_settings();
        let builder = KeyBuilder::new(&settings, None);
        let options = RequestOptions::get("/foo", "collection");

        let plan = CachePlan::with_defaults(&settings);
        let key = builder.generate(&plan, &options).unwrap();
        assert_eq!(key, "foo");
    }
}
