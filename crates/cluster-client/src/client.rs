//! Kubernetes-backed cluster client

use crate::cluster_trait::ClusterClientTrait;
use crate::error::ClusterError;
use crate::models::{ChildDefinition, ChildKey, ChildKind, ChildPatch, ChildSpec, ObservedChild};
use crate::resources;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use kube::Client;
use tracing::debug;

/// Field manager recorded on every write
pub const FIELD_MANAGER: &str = "myapp-controller";

/// Cluster client over the Kubernetes API.
///
/// Holds one `kube::Client`; cloning is cheap and shares the connection pool.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    /// Create a new client from an initialized `kube::Client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn deployments(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn services(&self, namespace: &str) -> Api<Service> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        }
    }

    fn patch_params() -> PatchParams {
        PatchParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        }
    }
}

#[async_trait::async_trait]
impl ClusterClientTrait for KubeClusterClient {
    async fn create_child(&self, definition: &ChildDefinition) -> Result<(), ClusterError> {
        let key = definition.key();
        debug!("Creating {}", key);

        match &definition.spec {
            ChildSpec::Workload(workload) => {
                let deployment = resources::deployment_for(definition, workload);
                self.deployments(&key.namespace)
                    .create(&Self::post_params(), &deployment)
                    .await
                    .map_err(|e| ClusterError::from_kube(e, &key))?;
            }
            ChildSpec::Service(service) => {
                let svc = resources::service_for(definition, service);
                self.services(&key.namespace)
                    .create(&Self::post_params(), &svc)
                    .await
                    .map_err(|e| ClusterError::from_kube(e, &key))?;
            }
        }
        Ok(())
    }

    async fn read_child(&self, key: &ChildKey) -> Result<ObservedChild, ClusterError> {
        debug!("Reading {}", key);

        match key.kind {
            ChildKind::Workload => {
                let deployment = self
                    .deployments(&key.namespace)
                    .get(&key.name)
                    .await
                    .map_err(|e| ClusterError::from_kube(e, key))?;
                Ok(resources::observed_from_deployment(key, &deployment))
            }
            ChildKind::Service => {
                let service = self
                    .services(&key.namespace)
                    .get(&key.name)
                    .await
                    .map_err(|e| ClusterError::from_kube(e, key))?;
                Ok(resources::observed_from_service(key, &service))
            }
        }
    }

    async fn patch_child(&self, patch: &ChildPatch) -> Result<(), ClusterError> {
        let key = &patch.key;
        debug!("Patching {} with {:?}", key, patch.changes);

        match key.kind {
            ChildKind::Workload => {
                let body = resources::deployment_patch_body(patch);
                self.deployments(&key.namespace)
                    .patch(&key.name, &Self::patch_params(), &Patch::Strategic(&body))
                    .await
                    .map_err(|e| ClusterError::from_kube(e, key))?;
            }
            ChildKind::Service => {
                let body = resources::service_patch_body(patch);
                self.services(&key.namespace)
                    .patch(&key.name, &Self::patch_params(), &Patch::Merge(&body))
                    .await
                    .map_err(|e| ClusterError::from_kube(e, key))?;
            }
        }
        Ok(())
    }

    async fn delete_child(&self, key: &ChildKey) -> Result<(), ClusterError> {
        debug!("Deleting {}", key);

        let dp = DeleteParams::background();
        match key.kind {
            ChildKind::Workload => {
                self.deployments(&key.namespace)
                    .delete(&key.name, &dp)
                    .await
                    .map_err(|e| ClusterError::from_kube(e, key))?;
            }
            ChildKind::Service => {
                self.services(&key.namespace)
                    .delete(&key.name, &dp)
                    .await
                    .map_err(|e| ClusterError::from_kube(e, key))?;
            }
        }
        Ok(())
    }
}
