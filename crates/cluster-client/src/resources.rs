//! Conversions between child models and Kubernetes objects.
//!
//! Also renders `ChildPatch` values into patch bodies: a strategic merge
//! patch for Deployments (containers and env entries merge by name) and a
//! JSON merge patch for Services.

use crate::models::{
    ChildDefinition, ChildKey, ChildPatch, EnvVar, ObservedChild, ResourceRequests,
    ServiceDefinition, WorkloadDefinition,
};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar as K8sEnvVar, PodSpec, PodTemplateSpec,
    ResourceRequirements, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

fn object_meta(definition: &ChildDefinition) -> ObjectMeta {
    ObjectMeta {
        name: Some(definition.name.clone()),
        namespace: Some(definition.namespace.clone()),
        labels: if definition.labels.is_empty() {
            None
        } else {
            Some(definition.labels.clone())
        },
        owner_references: definition.owner.clone().map(|o| vec![o]),
        ..Default::default()
    }
}

fn requests_map(resources: &ResourceRequests) -> Option<BTreeMap<String, Quantity>> {
    if resources.is_empty() {
        return None;
    }
    let mut requests = BTreeMap::new();
    if let Some(cpu) = &resources.cpu {
        requests.insert("cpu".to_string(), Quantity(cpu.clone()));
    }
    if let Some(memory) = &resources.memory {
        requests.insert("memory".to_string(), Quantity(memory.clone()));
    }
    Some(requests)
}

/// Render a workload definition as a Deployment
pub fn deployment_for(definition: &ChildDefinition, workload: &WorkloadDefinition) -> Deployment {
    let mut pod_labels = definition.labels.clone();
    pod_labels.extend(workload.selector.clone());

    Deployment {
        metadata: object_meta(definition),
        spec: Some(DeploymentSpec {
            replicas: Some(workload.replicas),
            selector: LabelSelector {
                match_labels: Some(workload.selector.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(pod_labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: workload.container.clone(),
                        image: Some(workload.image.clone()),
                        ports: Some(vec![ContainerPort {
                            container_port: workload.container_port,
                            ..Default::default()
                        }]),
                        resources: requests_map(&workload.resources).map(|requests| {
                            ResourceRequirements {
                                requests: Some(requests),
                                ..Default::default()
                            }
                        }),
                        env: Some(
                            workload
                                .env
                                .iter()
                                .map(|e| K8sEnvVar {
                                    name: e.name.clone(),
                                    value: Some(e.value.clone()),
                                    ..Default::default()
                                })
                                .collect(),
                        ),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Render a service definition as a Service
pub fn service_for(definition: &ChildDefinition, service: &ServiceDefinition) -> Service {
    Service {
        metadata: object_meta(definition),
        spec: Some(ServiceSpec {
            type_: Some(service.service_type.clone()),
            selector: Some(service.selector.clone()),
            ports: Some(vec![ServicePort {
                port: service.port,
                target_port: Some(IntOrString::Int(service.target_port)),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Extract the tracked fields of a live Deployment
pub fn observed_from_deployment(key: &ChildKey, deployment: &Deployment) -> ObservedChild {
    let spec = deployment.spec.as_ref();
    let container = spec
        .and_then(|s| s.template.spec.as_ref())
        .and_then(|p| p.containers.first());
    let requests = container
        .and_then(|c| c.resources.as_ref())
        .and_then(|r| r.requests.as_ref());

    ObservedChild {
        key: key.clone(),
        container: container.map(|c| c.name.clone()),
        image: container.and_then(|c| c.image.clone()),
        replicas: spec.and_then(|s| s.replicas),
        resources: ResourceRequests {
            cpu: requests.and_then(|r| r.get("cpu")).map(|q| q.0.clone()),
            memory: requests.and_then(|r| r.get("memory")).map(|q| q.0.clone()),
        },
        env: container
            .and_then(|c| c.env.as_ref())
            .map(|env| {
                env.iter()
                    .map(|e| EnvVar::new(e.name.clone(), e.value.clone().unwrap_or_default()))
                    .collect()
            })
            .unwrap_or_default(),
        port: None,
        target_port: None,
    }
}

/// Extract the tracked fields of a live Service
pub fn observed_from_service(key: &ChildKey, service: &Service) -> ObservedChild {
    let first_port = service
        .spec
        .as_ref()
        .and_then(|s| s.ports.as_ref())
        .and_then(|ports| ports.first());

    ObservedChild {
        key: key.clone(),
        container: None,
        image: None,
        replicas: None,
        resources: ResourceRequests::default(),
        env: Vec::new(),
        port: first_port.map(|p| p.port),
        target_port: first_port.and_then(|p| match &p.target_port {
            Some(IntOrString::Int(port)) => Some(*port),
            // Named target ports are never produced by this controller
            Some(IntOrString::String(_)) | None => None,
        }),
    }
}

/// Strategic merge patch body for a Deployment.
///
/// Only changed fields are present. Containers and env entries carry their
/// `name` so the API server merges them by key instead of replacing the list.
pub fn deployment_patch_body(patch: &ChildPatch) -> Value {
    let changes = &patch.changes;
    let mut spec = Map::new();

    if let Some(replicas) = changes.replicas {
        spec.insert("replicas".to_string(), json!(replicas));
    }

    if changes.touches_container() {
        let mut container = Map::new();
        container.insert(
            "name".to_string(),
            json!(patch.container.clone().unwrap_or_else(|| patch.key.name.clone())),
        );
        if let Some(image) = &changes.image {
            container.insert("image".to_string(), json!(image));
        }
        if !changes.resources.is_empty() {
            let mut requests = Map::new();
            if let Some(cpu) = &changes.resources.cpu {
                requests.insert("cpu".to_string(), json!(cpu));
            }
            if let Some(memory) = &changes.resources.memory {
                requests.insert("memory".to_string(), json!(memory));
            }
            container.insert("resources".to_string(), json!({ "requests": requests }));
        }
        if !changes.env.is_empty() {
            let env: Vec<Value> = changes
                .env
                .iter()
                .map(|e| json!({ "name": e.name, "value": e.value }))
                .collect();
            container.insert("env".to_string(), Value::Array(env));
        }
        spec.insert(
            "template".to_string(),
            json!({ "spec": { "containers": [Value::Object(container)] } }),
        );
    }

    json!({ "spec": spec })
}

/// JSON merge patch body for a Service.
///
/// The port list is owned entirely by the controller, so it is replaced.
pub fn service_patch_body(patch: &ChildPatch) -> Value {
    match patch.changes.port {
        Some(port) => json!({
            "spec": {
                "ports": [{
                    "port": port,
                    "targetPort": patch.changes.target_port.unwrap_or(port),
                    "protocol": "TCP",
                }]
            }
        }),
        None => json!({}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChildKind, ChildSpec, FieldChanges};

    fn test_workload() -> ChildDefinition {
        let mut selector = BTreeMap::new();
        selector.insert("app".to_string(), "demo-podinfo".to_string());
        ChildDefinition {
            name: "demo-podinfo".to_string(),
            namespace: "default".to_string(),
            labels: BTreeMap::new(),
            owner: None,
            spec: ChildSpec::Workload(WorkloadDefinition {
                container: "demo-podinfo".to_string(),
                image: "x:v1".to_string(),
                replicas: 2,
                selector,
                container_port: 9898,
                resources: ResourceRequests {
                    cpu: Some("100m".to_string()),
                    memory: None,
                },
                env: vec![
                    EnvVar::new("PODINFO_UI_COLOR", "#111"),
                    EnvVar::new("PODINFO_CACHE_SERVER", ""),
                ],
            }),
        }
    }

    #[test]
    fn test_deployment_observed_matches_definition() {
        let definition = test_workload();
        let workload = definition.workload().unwrap();
        let deployment = deployment_for(&definition, workload);

        let observed = observed_from_deployment(&definition.key(), &deployment);
        assert_eq!(observed, ObservedChild::from(&definition));
    }

    #[test]
    fn test_deployment_keeps_empty_env_value() {
        let definition = test_workload();
        let deployment = deployment_for(&definition, definition.workload().unwrap());
        let env = deployment.spec.unwrap().template.spec.unwrap().containers[0]
            .env
            .clone()
            .unwrap();

        let cache = env.iter().find(|e| e.name == "PODINFO_CACHE_SERVER").unwrap();
        assert_eq!(cache.value.as_deref(), Some(""));
    }

    #[test]
    fn test_replicas_only_patch_leaves_template_out() {
        let patch = ChildPatch {
            key: ChildKey::new(ChildKind::Workload, "default", "demo-podinfo"),
            container: Some("demo-podinfo".to_string()),
            changes: FieldChanges {
                replicas: Some(3),
                ..Default::default()
            },
        };

        assert_eq!(deployment_patch_body(&patch), json!({ "spec": { "replicas": 3 } }));
    }

    #[test]
    fn test_env_patch_addresses_container_and_vars_by_name() {
        let patch = ChildPatch {
            key: ChildKey::new(ChildKind::Workload, "default", "demo-podinfo"),
            container: Some("demo-podinfo".to_string()),
            changes: FieldChanges {
                env: vec![EnvVar::new("PODINFO_CACHE_SERVER", "")],
                ..Default::default()
            },
        };

        assert_eq!(
            deployment_patch_body(&patch),
            json!({
                "spec": {
                    "template": {
                        "spec": {
                            "containers": [{
                                "name": "demo-podinfo",
                                "env": [{"name": "PODINFO_CACHE_SERVER", "value": ""}]
                            }]
                        }
                    }
                }
            })
        );
    }
}
