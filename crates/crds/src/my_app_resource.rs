//! MyAppResource CRD
//!
//! Declares a podinfo-style application: one primary workload exposed by a
//! service, plus an optional cache workload and service toggled by
//! `cache.enabled`.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// API group of the MyAppResource CRD
pub const GROUP: &str = "my.api.group";

/// API version of the MyAppResource CRD
pub const VERSION: &str = "v1alpha1";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[kube(
    group = "my.api.group",
    version = "v1alpha1",
    kind = "MyAppResource",
    plural = "myappresources",
    shortname = "myapp",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct MyAppResourceSpec {
    /// Number of primary workload replicas (defaults to 1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_count: Option<i32>,

    /// Container image of the primary workload
    #[serde(default)]
    pub image: ImageSpec,

    /// Resource requests of the primary container
    #[serde(default)]
    pub resources: ResourceSpec,

    /// Display settings passed to the workload as environment
    #[serde(default)]
    pub ui: UiSpec,

    /// Optional cache subsystem
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheSpec>,

    /// Legacy name of `cache`, honoured only when `cache` is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis: Option<CacheSpec>,
}

impl MyAppResourceSpec {
    /// Whether the cache pair should exist, reading `cache` first and then `redis`
    pub fn cache_enabled(&self) -> bool {
        self.cache
            .as_ref()
            .or(self.redis.as_ref())
            .is_some_and(|cache| cache.enabled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImageSpec {
    /// Image repository, e.g. `ghcr.io/stefanprodan/podinfo`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    /// Image tag (defaults to `latest`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    /// CPU request quantity, e.g. `100m`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_request: Option<String>,

    /// Memory quantity, e.g. `128Mi`.
    ///
    /// Applied as the container's memory request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UiSpec {
    /// UI color, passed through unchanged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// UI message, passed through unchanged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CacheSpec {
    /// Whether the cache workload and service should exist
    #[serde(default)]
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_deserializes_full_document() {
        let spec: MyAppResourceSpec = serde_json::from_value(serde_json::json!({
            "replicaCount": 2,
            "image": {"repository": "ghcr.io/stefanprodan/podinfo", "tag": "6.5.0"},
            "resources": {"cpuRequest": "100m", "memoryLimit": "128Mi"},
            "ui": {"color": "#236bb8", "message": "hello"},
            "cache": {"enabled": true}
        }))
        .unwrap();

        assert_eq!(spec.replica_count, Some(2));
        assert_eq!(spec.image.tag.as_deref(), Some("6.5.0"));
        assert_eq!(spec.resources.memory_limit.as_deref(), Some("128Mi"));
        assert_eq!(spec.ui.message.as_deref(), Some("hello"));
        assert!(spec.cache_enabled());
    }

    #[test]
    fn test_spec_accepts_legacy_redis_field() {
        let spec: MyAppResourceSpec = serde_json::from_value(serde_json::json!({
            "image": {"repository": "x"},
            "redis": {"enabled": true}
        }))
        .unwrap();

        assert_eq!(spec.cache, None);
        assert!(spec.cache_enabled());
    }

    #[test]
    fn test_cache_field_takes_precedence_over_redis() {
        let spec: MyAppResourceSpec = serde_json::from_value(serde_json::json!({
            "image": {"repository": "x"},
            "cache": {"enabled": false},
            "redis": {"enabled": true}
        }))
        .unwrap();

        assert!(!spec.cache_enabled());
    }

    #[test]
    fn test_crd_schema_declares_cache_and_redis() {
        use kube::CustomResourceExt;

        let crd = serde_json::to_value(MyAppResource::crd()).unwrap();
        let properties =
            &crd["spec"]["versions"][0]["schema"]["openAPIV3Schema"]["properties"]["spec"]["properties"];

        for field in ["replicaCount", "image", "resources", "ui", "cache", "redis"] {
            assert!(properties.get(field).is_some(), "schema is missing `{field}`");
        }
    }

    #[test]
    fn test_spec_missing_sections_default_to_empty() {
        let spec: MyAppResourceSpec =
            serde_json::from_value(serde_json::json!({"image": {"repository": "x"}})).unwrap();

        assert_eq!(spec.replica_count, None);
        assert_eq!(spec.resources, ResourceSpec::default());
        assert_eq!(spec.ui, UiSpec::default());
        assert!(!spec.cache_enabled());
    }
}
