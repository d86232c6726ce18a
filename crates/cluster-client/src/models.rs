//! Child resource models
//!
//! These types describe the two child families the controller manages
//! (workloads and services) in terms of the fields reconciliation cares
//! about. Conversions to and from Kubernetes objects live in `resources`.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use std::collections::BTreeMap;
use std::fmt;

/// Kind of a child resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChildKind {
    /// A Deployment
    Workload,
    /// A Service
    Service,
}

impl fmt::Display for ChildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildKind::Workload => write!(f, "Deployment"),
            ChildKind::Service => write!(f, "Service"),
        }
    }
}

/// Identity of a child resource: kind, namespace and derived name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChildKey {
    pub kind: ChildKind,
    pub namespace: String,
    pub name: String,
}

impl ChildKey {
    pub fn new(kind: ChildKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ChildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// Kind of operation issued against a child
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildOperation {
    Create,
    Read,
    Patch,
    Delete,
}

impl fmt::Display for ChildOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChildOperation::Create => "create",
            ChildOperation::Read => "read",
            ChildOperation::Patch => "patch",
            ChildOperation::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// A single environment variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Container resource requests. `None` means the request is not managed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResourceRequests {
    pub cpu: Option<String>,
    pub memory: Option<String>,
}

impl ResourceRequests {
    pub fn is_empty(&self) -> bool {
        self.cpu.is_none() && self.memory.is_none()
    }
}

/// Desired state of a workload child
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadDefinition {
    /// Name of the single container in the pod template
    pub container: String,
    /// Full image reference (`repository:tag`)
    pub image: String,
    pub replicas: i32,
    /// Labels used both as pod labels and as the deployment selector
    pub selector: BTreeMap<String, String>,
    pub container_port: i32,
    pub resources: ResourceRequests,
    /// Ordered, name-unique environment
    pub env: Vec<EnvVar>,
}

/// Desired state of a service child
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDefinition {
    pub selector: BTreeMap<String, String>,
    pub port: i32,
    pub target_port: i32,
    /// `ClusterIP` or `NodePort`
    pub service_type: String,
}

/// Kind-specific part of a child definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildSpec {
    Workload(WorkloadDefinition),
    Service(ServiceDefinition),
}

/// Description of one desired child resource.
///
/// Built fresh from the parent spec on every pass and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildDefinition {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    pub owner: Option<OwnerReference>,
    pub spec: ChildSpec,
}

impl ChildDefinition {
    pub fn kind(&self) -> ChildKind {
        match self.spec {
            ChildSpec::Workload(_) => ChildKind::Workload,
            ChildSpec::Service(_) => ChildKind::Service,
        }
    }

    pub fn key(&self) -> ChildKey {
        ChildKey::new(self.kind(), self.namespace.clone(), self.name.clone())
    }

    /// Workload part, if this is a workload
    pub fn workload(&self) -> Option<&WorkloadDefinition> {
        match &self.spec {
            ChildSpec::Workload(w) => Some(w),
            ChildSpec::Service(_) => None,
        }
    }

    /// Service part, if this is a service
    pub fn service(&self) -> Option<&ServiceDefinition> {
        match &self.spec {
            ChildSpec::Service(s) => Some(s),
            ChildSpec::Workload(_) => None,
        }
    }
}

/// Live state of a child, restricted to the fields reconciliation tracks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedChild {
    pub key: ChildKey,
    /// First container name (workloads only)
    pub container: Option<String>,
    pub image: Option<String>,
    pub replicas: Option<i32>,
    pub resources: ResourceRequests,
    /// Environment as read, in container order
    pub env: Vec<EnvVar>,
    /// First service port (services only)
    pub port: Option<i32>,
    /// Target port of the first service port (services only)
    pub target_port: Option<i32>,
}

impl ObservedChild {
    /// Value of the named environment variable, if present
    pub fn env_value(&self, name: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.value.as_str())
    }
}

impl From<&ChildDefinition> for ObservedChild {
    /// The state a freshly created child reports back
    fn from(definition: &ChildDefinition) -> Self {
        match &definition.spec {
            ChildSpec::Workload(w) => Self {
                key: definition.key(),
                container: Some(w.container.clone()),
                image: Some(w.image.clone()),
                replicas: Some(w.replicas),
                resources: w.resources.clone(),
                env: w.env.clone(),
                port: None,
                target_port: None,
            },
            ChildSpec::Service(s) => Self {
                key: definition.key(),
                container: None,
                image: None,
                replicas: None,
                resources: ResourceRequests::default(),
                env: Vec::new(),
                port: Some(s.port),
                target_port: Some(s.target_port),
            },
        }
    }
}

/// The set of changed fields of one child. Unset fields are left alone.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldChanges {
    pub replicas: Option<i32>,
    pub image: Option<String>,
    /// Only the request keys that changed are set
    pub resources: ResourceRequests,
    /// Added or changed environment variables, matched by name
    pub env: Vec<EnvVar>,
    /// Service port and target port, always changed together
    pub port: Option<i32>,
    pub target_port: Option<i32>,
}

impl FieldChanges {
    pub fn is_empty(&self) -> bool {
        self.replicas.is_none()
            && self.image.is_none()
            && self.resources.is_empty()
            && self.env.is_empty()
            && self.port.is_none()
            && self.target_port.is_none()
    }

    /// Whether any field inside the pod template changed
    pub fn touches_container(&self) -> bool {
        self.image.is_some() || !self.resources.is_empty() || !self.env.is_empty()
    }
}

/// A targeted overwrite of named fields on one child
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildPatch {
    pub key: ChildKey,
    /// Container addressed by container-level changes
    pub container: Option<String>,
    pub changes: FieldChanges,
}
