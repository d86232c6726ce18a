//! Mock ClusterClient for unit testing
//!
//! Stores child resources in memory, records every call, and can be told to
//! fail specific operations so tests can exercise partial-failure paths
//! without a running cluster.

use crate::cluster_trait::ClusterClientTrait;
use crate::error::ClusterError;
use crate::models::{ChildDefinition, ChildKey, ChildOperation, ChildPatch, ObservedChild};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One recorded call against the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    Create(ChildKey),
    Read(ChildKey),
    Patch(ChildPatch),
    Delete(ChildKey),
}

impl ClientCall {
    /// Whether this call can change cluster state
    pub fn is_mutating(&self) -> bool {
        !matches!(self, ClientCall::Read(_))
    }
}

/// Mock ClusterClient for testing
#[derive(Clone, Default)]
pub struct MockClusterClient {
    children: Arc<Mutex<BTreeMap<ChildKey, ObservedChild>>>,
    calls: Arc<Mutex<Vec<ClientCall>>>,
    failures: Arc<Mutex<HashMap<(ChildOperation, ChildKey), String>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockClusterClient {
    /// Create an empty mock cluster
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a child into the mock store (for test setup)
    pub fn insert(&self, observed: ObservedChild) {
        lock(&self.children).insert(observed.key.clone(), observed);
    }

    /// Put a child into the mock store as if it had been created from `definition`
    pub fn insert_definition(&self, definition: &ChildDefinition) {
        self.insert(ObservedChild::from(definition));
    }

    /// Remove a child behind the controller's back (for drift tests)
    pub fn remove(&self, key: &ChildKey) -> Option<ObservedChild> {
        lock(&self.children).remove(key)
    }

    /// Current state of a child
    pub fn get(&self, key: &ChildKey) -> Option<ObservedChild> {
        lock(&self.children).get(key).cloned()
    }

    /// Keys of all stored children, sorted
    pub fn keys(&self) -> Vec<ChildKey> {
        lock(&self.children).keys().cloned().collect()
    }

    /// All recorded calls, in order
    pub fn calls(&self) -> Vec<ClientCall> {
        lock(&self.calls).clone()
    }

    /// Recorded calls that could change state
    pub fn mutating_calls(&self) -> Vec<ClientCall> {
        self.calls().into_iter().filter(ClientCall::is_mutating).collect()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Make `operation` on `key` fail with a transport error until cleared
    pub fn fail_on(&self, operation: ChildOperation, key: ChildKey) {
        lock(&self.failures).insert(
            (operation, key.clone()),
            format!("injected {} failure for {}", operation, key),
        );
    }

    /// Remove all injected failures
    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    fn record(&self, call: ClientCall) {
        lock(&self.calls).push(call);
    }

    fn injected(&self, operation: ChildOperation, key: &ChildKey) -> Result<(), ClusterError> {
        match lock(&self.failures).get(&(operation, key.clone())) {
            Some(message) => Err(ClusterError::Transport(message.clone())),
            None => Ok(()),
        }
    }
}

/// Apply a targeted patch the way the API server merges it
fn apply_patch(observed: &mut ObservedChild, patch: &ChildPatch) {
    let changes = &patch.changes;
    if let Some(replicas) = changes.replicas {
        observed.replicas = Some(replicas);
    }
    if let Some(image) = &changes.image {
        observed.image = Some(image.clone());
    }
    if let Some(cpu) = &changes.resources.cpu {
        observed.resources.cpu = Some(cpu.clone());
    }
    if let Some(memory) = &changes.resources.memory {
        observed.resources.memory = Some(memory.clone());
    }
    for var in &changes.env {
        match observed.env.iter_mut().find(|e| e.name == var.name) {
            Some(existing) => existing.value = var.value.clone(),
            None => observed.env.push(var.clone()),
        }
    }
    if let Some(port) = changes.port {
        observed.port = Some(port);
        observed.target_port = Some(changes.target_port.unwrap_or(port));
    }
}

#[async_trait::async_trait]
impl ClusterClientTrait for MockClusterClient {
    async fn create_child(&self, definition: &ChildDefinition) -> Result<(), ClusterError> {
        let key = definition.key();
        self.record(ClientCall::Create(key.clone()));
        self.injected(ChildOperation::Create, &key)?;

        let mut children = lock(&self.children);
        if children.contains_key(&key) {
            return Err(ClusterError::AlreadyExists(key.to_string()));
        }
        children.insert(key, ObservedChild::from(definition));
        Ok(())
    }

    async fn read_child(&self, key: &ChildKey) -> Result<ObservedChild, ClusterError> {
        self.record(ClientCall::Read(key.clone()));
        self.injected(ChildOperation::Read, key)?;

        lock(&self.children)
            .get(key)
            .cloned()
            .ok_or_else(|| ClusterError::NotFound(key.to_string()))
    }

    async fn patch_child(&self, patch: &ChildPatch) -> Result<(), ClusterError> {
        self.record(ClientCall::Patch(patch.clone()));
        self.injected(ChildOperation::Patch, &patch.key)?;

        let mut children = lock(&self.children);
        let observed = children
            .get_mut(&patch.key)
            .ok_or_else(|| ClusterError::NotFound(patch.key.to_string()))?;
        apply_patch(observed, patch);
        Ok(())
    }

    async fn delete_child(&self, key: &ChildKey) -> Result<(), ClusterError> {
        self.record(ClientCall::Delete(key.clone()));
        self.injected(ChildOperation::Delete, key)?;

        lock(&self.children)
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| ClusterError::NotFound(key.to_string()))
    }
}
