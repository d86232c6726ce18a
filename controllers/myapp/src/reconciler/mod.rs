//! Reconciliation engine for MyAppResource.
//!
//! Components, leaf first:
//! - `desired`: Desired-State Builder (spec -> child definitions)
//! - `observed`: Observed-State Reader
//! - `diff`: Diff & Patch Calculator
//! - `cache`: Cache Subsystem Lifecycle
//! - `engine`: create/update/delete orchestration
//! - `cascade`: Deletion Cascade Handler

pub mod cache;
pub mod cascade;
pub mod desired;
pub mod diff;
pub mod engine;
pub mod observed;
pub mod quantity;
pub mod report;

#[cfg(test)]
mod cascade_test;

pub use report::{AppliedAction, ChildFailure, Outcome, PassReport};

use crate::error::ControllerError;
use async_trait::async_trait;
use cluster_client::ClusterClientTrait;
use crds::{MyAppResource, MyAppResourceSpec};

/// The parent resource as seen by one reconciliation pass
#[derive(Debug, Clone, PartialEq)]
pub struct ParentSpec {
    pub name: String,
    pub namespace: String,
    /// UID used for owner references; unset for parents not yet persisted
    pub uid: Option<String>,
    pub spec: MyAppResourceSpec,
}

impl ParentSpec {
    /// Take identity and spec from a watched resource
    pub fn from_resource(
        resource: &MyAppResource,
        default_namespace: &str,
    ) -> Result<Self, ControllerError> {
        let name = resource
            .metadata
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ControllerError::MalformedSpec("MyAppResource missing name".to_string()))?;
        let namespace = resource
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| default_namespace.to_string());

        Ok(Self {
            name,
            namespace,
            uid: resource.metadata.uid.clone(),
            spec: resource.spec.clone(),
        })
    }

    /// Same parent identity carrying a different spec
    pub fn with_spec(&self, spec: MyAppResourceSpec) -> Self {
        Self {
            spec,
            ..self.clone()
        }
    }

    /// `namespace/name`, used to key per-parent state
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// The three entry points the event dispatcher calls
#[async_trait]
pub trait ParentEventHandler: Send + Sync {
    /// Parent observed for the first time
    async fn on_create(&self, parent: &ParentSpec) -> Result<PassReport, ControllerError>;

    /// Parent spec (possibly) changed since the last handled pass
    async fn on_update(
        &self,
        old: &ParentSpec,
        new: &ParentSpec,
    ) -> Result<PassReport, ControllerError>;

    /// Parent is being removed
    async fn on_delete(&self, parent: &ParentSpec) -> Result<PassReport, ControllerError>;
}

/// Reconciles MyAppResource parents into their child resources.
pub struct Reconciler {
    pub(crate) client: Box<dyn ClusterClientTrait + Send + Sync>,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(client: impl ClusterClientTrait + Send + Sync + 'static) -> Self {
        Self {
            client: Box::new(client),
        }
    }

    pub(crate) fn client(&self) -> &(dyn ClusterClientTrait + Send + Sync) {
        self.client.as_ref()
    }
}
