//! Integration tests for the cluster client
//!
//! These tests require a reachable cluster (current kubeconfig context).
//! Set TEST_NAMESPACE to choose the namespace (defaults to "default").

use cluster_client::{
    ChildDefinition, ChildKey, ChildKind, ChildPatch, ChildSpec, ClusterClientTrait,
    ClusterError, EnvVar, FieldChanges, KubeClusterClient, ResourceRequests,
    WorkloadDefinition,
};
use std::collections::BTreeMap;

fn namespace() -> String {
    std::env::var("TEST_NAMESPACE").unwrap_or_else(|_| "default".to_string())
}

fn test_workload(name: &str) -> ChildDefinition {
    let mut selector = BTreeMap::new();
    selector.insert("app".to_string(), name.to_string());
    ChildDefinition {
        name: name.to_string(),
        namespace: namespace(),
        labels: BTreeMap::new(),
        owner: None,
        spec: ChildSpec::Workload(WorkloadDefinition {
            container: name.to_string(),
            image: "ghcr.io/stefanprodan/podinfo:latest".to_string(),
            replicas: 1,
            selector,
            container_port: 9898,
            resources: ResourceRequests::default(),
            env: vec![
                EnvVar::new("PODINFO_UI_MESSAGE", "integration"),
                EnvVar::new("PODINFO_CACHE_SERVER", ""),
            ],
        }),
    }
}

#[tokio::test]
#[ignore] // Requires a running cluster
async fn test_read_missing_child_is_not_found() {
    let client = KubeClusterClient::new(kube::Client::try_default().await.expect("kube client"));
    let key = ChildKey::new(ChildKind::Workload, namespace(), "cluster-client-does-not-exist");

    let result = client.read_child(&key).await;
    assert!(matches!(result, Err(ClusterError::NotFound(_))));
}

#[tokio::test]
#[ignore]
async fn test_workload_lifecycle() {
    let client = KubeClusterClient::new(kube::Client::try_default().await.expect("kube client"));
    let definition = test_workload("cluster-client-it");
    let key = definition.key();

    client.create_child(&definition).await.expect("create");
    let replayed = client.create_child(&definition).await;
    assert!(matches!(replayed, Err(ClusterError::AlreadyExists(_))));

    let patch = ChildPatch {
        key: key.clone(),
        container: Some(definition.name.clone()),
        changes: FieldChanges {
            replicas: Some(2),
            env: vec![EnvVar::new("PODINFO_UI_MESSAGE", "patched")],
            ..Default::default()
        },
    };
    client.patch_child(&patch).await.expect("patch");

    let observed = client.read_child(&key).await.expect("read");
    assert_eq!(observed.replicas, Some(2));
    assert_eq!(observed.env_value("PODINFO_UI_MESSAGE"), Some("patched"));
    // Untouched variables survive a targeted patch
    assert_eq!(observed.env_value("PODINFO_CACHE_SERVER"), Some(""));

    client.delete_child(&key).await.expect("delete");
    let second = client.delete_child(&key).await;
    assert!(matches!(second, Err(ClusterError::NotFound(_))));
}
