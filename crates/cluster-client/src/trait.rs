//! ClusterClient trait for mocking
//!
//! This trait abstracts the control-plane client to enable mocking in unit tests.
//! `KubeClusterClient` implements it against a live cluster; tests use
//! `MockClusterClient`.

use crate::error::ClusterError;
use crate::models::{ChildDefinition, ChildKey, ChildPatch, ObservedChild};

/// Trait for child resource operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ClusterClientTrait: Send + Sync {
    /// Create a child resource.
    ///
    /// Returns `ClusterError::AlreadyExists` if a resource with the same kind,
    /// namespace and name is already present.
    async fn create_child(&self, definition: &ChildDefinition) -> Result<(), ClusterError>;

    /// Read the live state of a child resource.
    ///
    /// Returns `ClusterError::NotFound` if it does not exist.
    async fn read_child(&self, key: &ChildKey) -> Result<ObservedChild, ClusterError>;

    /// Overwrite the named fields of a child resource, leaving all others untouched.
    async fn patch_child(&self, patch: &ChildPatch) -> Result<(), ClusterError>;

    /// Delete a child resource.
    ///
    /// Returns `ClusterError::NotFound` if it does not exist.
    async fn delete_child(&self, key: &ChildKey) -> Result<(), ClusterError>;
}
