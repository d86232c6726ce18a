//! Test utilities for unit testing reconcilers
//!
//! This module provides helpers for creating test data and setting up test scenarios.

use crate::reconciler::desired::{self, DesiredState};
use crate::reconciler::{ParentSpec, Reconciler};
use cluster_client::{ChildKey, EnvVar, MockClusterClient, ObservedChild};
use crds::{CacheSpec, ImageSpec, MyAppResource, MyAppResourceSpec, ResourceSpec, UiSpec};

pub const TEST_NAMESPACE: &str = "apps";
pub const TEST_NAME: &str = "demo";
pub const TEST_UID: &str = "0b6f0c1e-8a7d-4c1c-9a57-2f3c52d1e001";

/// The reference spec: one replica of `x:v1` with requests, UI settings and the cache on
pub fn scenario_spec() -> MyAppResourceSpec {
    MyAppResourceSpec {
        replica_count: Some(1),
        image: ImageSpec {
            repository: Some("x".to_string()),
            tag: Some("v1".to_string()),
        },
        resources: ResourceSpec {
            cpu_request: Some("100m".to_string()),
            memory_limit: Some("128Mi".to_string()),
        },
        ui: UiSpec {
            color: Some("#111".to_string()),
            message: Some("hi".to_string()),
        },
        cache: Some(CacheSpec { enabled: true }),
        redis: None,
    }
}

/// Parent with the reference spec and the given cache flag
pub fn test_parent(cache_enabled: bool) -> ParentSpec {
    let mut spec = scenario_spec();
    spec.cache = Some(CacheSpec {
        enabled: cache_enabled,
    });
    ParentSpec {
        name: TEST_NAME.to_string(),
        namespace: TEST_NAMESPACE.to_string(),
        uid: Some(TEST_UID.to_string()),
        spec,
    }
}

/// Watched resource wrapping `spec`
pub fn test_resource(name: &str, spec: MyAppResourceSpec) -> MyAppResource {
    let mut resource = MyAppResource::new(name, spec);
    resource.metadata.namespace = Some(TEST_NAMESPACE.to_string());
    resource.metadata.uid = Some(TEST_UID.to_string());
    resource
}

/// Reconciler over a fresh mock; the returned mock shares state with it
pub fn test_reconciler() -> (Reconciler, MockClusterClient) {
    let mock = MockClusterClient::new();
    (Reconciler::new(mock.clone()), mock)
}

/// Desired state of `parent`, panicking on a malformed spec
pub fn desired_for(parent: &ParentSpec) -> DesiredState {
    desired::build(parent).expect("test parent should be well formed")
}

/// Populate the mock with every child `parent` should have
pub fn seed_children(mock: &MockClusterClient, parent: &ParentSpec) {
    let desired = desired_for(parent);
    mock.insert_definition(&desired.primary.workload);
    mock.insert_definition(&desired.primary.service);
    if let Some(cache) = &desired.cache {
        mock.insert_definition(&cache.workload);
        mock.insert_definition(&cache.service);
    }
}

/// Live children a single build of `parent` produces, sorted by key
pub fn expected_children(parent: &ParentSpec) -> Vec<ObservedChild> {
    let desired = desired_for(parent);
    let mut definitions = vec![desired.primary.workload, desired.primary.service];
    if let Some(cache) = desired.cache {
        definitions.push(cache.workload);
        definitions.push(cache.service);
    }
    let mut children: Vec<ObservedChild> = definitions.iter().map(ObservedChild::from).collect();
    children.sort_by(|a, b| a.key.cmp(&b.key));
    children
}

/// Everything currently in the mock, sorted by key
pub fn live_children(mock: &MockClusterClient) -> Vec<ObservedChild> {
    mock.keys()
        .iter()
        .filter_map(|key| mock.get(key))
        .collect()
}

/// Env value shortcut
pub fn env(name: &str, value: &str) -> EnvVar {
    EnvVar::new(name, value)
}

/// Key shortcut in the test namespace
pub fn key(kind: cluster_client::ChildKind, name: &str) -> ChildKey {
    ChildKey::new(kind, TEST_NAMESPACE, name)
}
