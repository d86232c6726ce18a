//! Cluster client errors

use crate::models::ChildKey;
use thiserror::Error;

/// Errors that can occur when talking to the control plane
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Child resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Child resource already exists (create replayed)
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Kubernetes API or transport error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Connectivity failure that did not come from the Kubernetes client
    #[error("Transport error: {0}")]
    Transport(String),
}

impl ClusterError {
    /// Classify a kube error for the given child.
    ///
    /// 404 becomes `NotFound`, 409 becomes `AlreadyExists`, everything else
    /// stays a transport-level `Kube` error.
    pub fn from_kube(error: kube::Error, key: &ChildKey) -> Self {
        match error {
            kube::Error::Api(ref e) if e.code == 404 => Self::NotFound(key.to_string()),
            kube::Error::Api(ref e) if e.code == 409 => Self::AlreadyExists(key.to_string()),
            other => Self::Kube(other),
        }
    }

    /// Check if this error indicates a not-found condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this error indicates the resource already exists
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }
}
