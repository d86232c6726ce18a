//! Desired-State Builder.
//!
//! Pure mapping from a parent spec to the child definitions that should
//! exist. Every child name is derived from the parent name plus a fixed
//! suffix.

use super::ParentSpec;
use crate::error::ControllerError;
use cluster_client::{
    ChildDefinition, ChildKey, ChildKind, ChildSpec, EnvVar, ResourceRequests, ServiceDefinition,
    WorkloadDefinition,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use std::collections::BTreeMap;

pub const PRIMARY_SUFFIX: &str = "-podinfo";
pub const PRIMARY_SERVICE_SUFFIX: &str = "-podinfo-svc";
pub const CACHE_SUFFIX: &str = "-cache";
pub const CACHE_SERVICE_SUFFIX: &str = "-cache-svc";

pub const PRIMARY_CONTAINER_PORT: i32 = 9898;
pub const PRIMARY_SERVICE_PORT: i32 = 8080;
pub const CACHE_IMAGE: &str = "redis:latest";
pub const CACHE_PORT: i32 = 6379;
pub const CACHE_SCHEME: &str = "tcp";

pub const ENV_UI_COLOR: &str = "PODINFO_UI_COLOR";
pub const ENV_UI_MESSAGE: &str = "PODINFO_UI_MESSAGE";
pub const ENV_CACHE_SERVER: &str = "PODINFO_CACHE_SERVER";

pub const LABEL_APP: &str = "app";
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const LABEL_INSTANCE: &str = "app.kubernetes.io/instance";
pub const MANAGER_NAME: &str = "myapp-controller";

const DEFAULT_REPLICAS: i32 = 1;
const DEFAULT_TAG: &str = "latest";
const MAX_NAME_LEN: usize = 63;

/// Names of all four children of one parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildNames {
    pub primary_workload: String,
    pub primary_service: String,
    pub cache_workload: String,
    pub cache_service: String,
}

impl ChildNames {
    pub fn for_parent(name: &str) -> Self {
        Self {
            primary_workload: format!("{}{}", name, PRIMARY_SUFFIX),
            primary_service: format!("{}{}", name, PRIMARY_SERVICE_SUFFIX),
            cache_workload: format!("{}{}", name, CACHE_SUFFIX),
            cache_service: format!("{}{}", name, CACHE_SERVICE_SUFFIX),
        }
    }
}

/// Keys of one workload/service pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairKeys {
    pub workload: ChildKey,
    pub service: ChildKey,
}

/// Keys of every child a parent can own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildKeys {
    pub primary: PairKeys,
    pub cache: PairKeys,
}

impl ChildKeys {
    pub fn for_parent(parent: &ParentSpec) -> Self {
        let names = ChildNames::for_parent(&parent.name);
        let ns = parent.namespace.as_str();
        Self {
            primary: PairKeys {
                workload: ChildKey::new(ChildKind::Workload, ns, names.primary_workload),
                service: ChildKey::new(ChildKind::Service, ns, names.primary_service),
            },
            cache: PairKeys {
                workload: ChildKey::new(ChildKind::Workload, ns, names.cache_workload),
                service: ChildKey::new(ChildKind::Service, ns, names.cache_service),
            },
        }
    }
}

/// A workload together with the service in front of it
#[derive(Debug, Clone, PartialEq)]
pub struct ChildPair {
    pub workload: ChildDefinition,
    pub service: ChildDefinition,
}

/// Everything that should exist for one parent
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredState {
    pub primary: ChildPair,
    /// `None` when the cache is disabled
    pub cache: Option<ChildPair>,
}

/// Connection string addressing the cache service of `parent_name`
pub fn cache_address(parent_name: &str) -> String {
    format!(
        "{}://{}{}:{}",
        CACHE_SCHEME, parent_name, CACHE_SERVICE_SUFFIX, CACHE_PORT
    )
}

/// Reject specs the builder cannot default
pub fn validate(parent: &ParentSpec) -> Result<(), ControllerError> {
    validate_name(&parent.name)?;

    if let Some(replicas) = parent.spec.replica_count {
        if replicas < 1 {
            return Err(ControllerError::MalformedSpec(format!(
                "replicaCount must be at least 1, got {}",
                replicas
            )));
        }
    }

    let repository = parent.spec.image.repository.as_deref().unwrap_or("");
    if repository.trim().is_empty() {
        return Err(ControllerError::MalformedSpec(
            "image.repository is required".to_string(),
        ));
    }

    Ok(())
}

fn validate_name(name: &str) -> Result<(), ControllerError> {
    let longest = name.len() + PRIMARY_SERVICE_SUFFIX.len();
    if longest > MAX_NAME_LEN {
        return Err(ControllerError::MalformedSpec(format!(
            "name '{}' is too long: child names would exceed {} characters",
            name, MAX_NAME_LEN
        )));
    }

    let starts_with_letter = name.chars().next().is_some_and(|c| c.is_ascii_lowercase());
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !starts_with_letter || !valid_chars {
        return Err(ControllerError::MalformedSpec(format!(
            "name '{}' must start with a lowercase letter and contain only lowercase letters, digits and '-'",
            name
        )));
    }

    Ok(())
}

/// Build the desired child set for `parent`
pub fn build(parent: &ParentSpec) -> Result<DesiredState, ControllerError> {
    validate(parent)?;

    let names = ChildNames::for_parent(&parent.name);
    let cache_enabled = parent.spec.cache_enabled();

    let primary = ChildPair {
        workload: child(
            parent,
            &names.primary_workload,
            ChildSpec::Workload(primary_workload(parent, &names, cache_enabled)),
        ),
        service: child(
            parent,
            &names.primary_service,
            ChildSpec::Service(ServiceDefinition {
                selector: app_selector(&names.primary_workload),
                port: PRIMARY_SERVICE_PORT,
                target_port: PRIMARY_CONTAINER_PORT,
                service_type: "NodePort".to_string(),
            }),
        ),
    };

    let cache = cache_enabled.then(|| ChildPair {
        workload: child(
            parent,
            &names.cache_workload,
            ChildSpec::Workload(WorkloadDefinition {
                container: names.cache_workload.clone(),
                image: CACHE_IMAGE.to_string(),
                replicas: 1,
                selector: app_selector(&names.cache_workload),
                container_port: CACHE_PORT,
                resources: ResourceRequests::default(),
                env: Vec::new(),
            }),
        ),
        service: child(
            parent,
            &names.cache_service,
            ChildSpec::Service(ServiceDefinition {
                selector: app_selector(&names.cache_workload),
                port: CACHE_PORT,
                target_port: CACHE_PORT,
                service_type: "ClusterIP".to_string(),
            }),
        ),
    });

    Ok(DesiredState { primary, cache })
}

fn primary_workload(
    parent: &ParentSpec,
    names: &ChildNames,
    cache_enabled: bool,
) -> WorkloadDefinition {
    let spec = &parent.spec;
    let repository = spec.image.repository.as_deref().unwrap_or("").trim();
    let tag = spec
        .image
        .tag
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TAG);

    // Empty cache address is the "cache disabled" signal, never omitted.
    let cache_server = if cache_enabled {
        cache_address(&parent.name)
    } else {
        String::new()
    };

    WorkloadDefinition {
        container: names.primary_workload.clone(),
        image: format!("{}:{}", repository, tag),
        replicas: spec.replica_count.unwrap_or(DEFAULT_REPLICAS),
        selector: app_selector(&names.primary_workload),
        container_port: PRIMARY_CONTAINER_PORT,
        resources: ResourceRequests {
            cpu: spec.resources.cpu_request.clone(),
            memory: spec.resources.memory_limit.clone(),
        },
        env: vec![
            EnvVar::new(ENV_UI_COLOR, spec.ui.color.clone().unwrap_or_default()),
            EnvVar::new(ENV_UI_MESSAGE, spec.ui.message.clone().unwrap_or_default()),
            EnvVar::new(ENV_CACHE_SERVER, cache_server),
        ],
    }
}

fn child(parent: &ParentSpec, name: &str, spec: ChildSpec) -> ChildDefinition {
    ChildDefinition {
        name: name.to_string(),
        namespace: parent.namespace.clone(),
        labels: standard_labels(&parent.name),
        owner: owner_reference(parent),
        spec,
    }
}

fn app_selector(workload_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(LABEL_APP.to_string(), workload_name.to_string())])
}

fn standard_labels(parent_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_MANAGED_BY.to_string(), MANAGER_NAME.to_string()),
        (LABEL_INSTANCE.to_string(), parent_name.to_string()),
    ])
}

/// Owner reference to the parent; omitted when the parent has no UID yet
fn owner_reference(parent: &ParentSpec) -> Option<OwnerReference> {
    let uid = parent.uid.clone()?;
    Some(OwnerReference {
        api_version: format!("{}/{}", crds::GROUP, crds::VERSION),
        kind: "MyAppResource".to_string(),
        name: parent.name.clone(),
        uid,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}
