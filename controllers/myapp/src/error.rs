//! Controller-specific error types.
//!
//! This module defines error types specific to the MyApp Controller
//! that are not covered by upstream library errors.

use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the MyApp Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error (parent resource operations)
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// JSON serialization error (annotations, patches)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Parent spec cannot be turned into child definitions
    #[error("Malformed spec: {0}")]
    MalformedSpec(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// One or more child operations in a pass failed
    #[error("Reconciliation partially failed: {0}")]
    PartialFailure(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
