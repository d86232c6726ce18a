//! Diff & Patch Calculator.
//!
//! Compares one desired child against its observation and yields the
//! smallest action that converges it. Only tracked fields are compared and
//! only changed fields end up in a patch.

use super::observed::Observation;
use super::quantity::same_quantity;
use cluster_client::{
    ChildDefinition, ChildKey, ChildPatch, ChildSpec, EnvVar, FieldChanges, ObservedChild,
    ResourceRequests, ServiceDefinition, WorkloadDefinition,
};

/// What to do with one child
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileAction {
    NoOp,
    Create(ChildDefinition),
    Patch(ChildPatch),
    Delete(ChildKey),
}

impl ReconcileAction {
    pub fn is_noop(&self) -> bool {
        matches!(self, ReconcileAction::NoOp)
    }
}

/// Decide how to converge `observed` towards `desired`
pub fn decide(desired: &ChildDefinition, observed: &Observation) -> ReconcileAction {
    let Some(observed) = observed.as_present() else {
        return ReconcileAction::Create(desired.clone());
    };

    let (container, changes) = match &desired.spec {
        ChildSpec::Workload(w) => (Some(w.container.clone()), workload_changes(w, observed)),
        ChildSpec::Service(s) => (None, service_changes(s, observed)),
    };

    if changes.is_empty() {
        ReconcileAction::NoOp
    } else {
        ReconcileAction::Patch(ChildPatch {
            key: desired.key(),
            container,
            changes,
        })
    }
}

fn workload_changes(desired: &WorkloadDefinition, observed: &ObservedChild) -> FieldChanges {
    FieldChanges {
        replicas: changed(Some(desired.replicas), observed.replicas),
        image: changed(Some(desired.image.clone()), observed.image.clone()),
        resources: ResourceRequests {
            cpu: quantity_changed(
                desired.resources.cpu.as_deref(),
                observed.resources.cpu.as_deref(),
            ),
            memory: quantity_changed(
                desired.resources.memory.as_deref(),
                observed.resources.memory.as_deref(),
            ),
        },
        env: env_changes(&desired.env, observed),
        ..FieldChanges::default()
    }
}

fn service_changes(desired: &ServiceDefinition, observed: &ObservedChild) -> FieldChanges {
    let drifted = observed.port != Some(desired.port)
        || observed.target_port != Some(desired.target_port);
    if drifted {
        FieldChanges {
            port: Some(desired.port),
            target_port: Some(desired.target_port),
            ..FieldChanges::default()
        }
    } else {
        FieldChanges::default()
    }
}

/// Desired variables whose observed value differs or is missing.
/// Observed variables the desired set does not name are left alone.
fn env_changes(desired: &[EnvVar], observed: &ObservedChild) -> Vec<EnvVar> {
    desired
        .iter()
        .filter(|var| observed.env_value(&var.name) != Some(var.value.as_str()))
        .cloned()
        .collect()
}

/// `desired` if set and different from `observed`; unset desired values are unmanaged
fn changed<T: PartialEq>(desired: Option<T>, observed: Option<T>) -> Option<T> {
    match desired {
        Some(value) if observed.as_ref() != Some(&value) => Some(value),
        _ => None,
    }
}

/// Like [`changed`], comparing quantities by value rather than notation
fn quantity_changed(desired: Option<&str>, observed: Option<&str>) -> Option<String> {
    match (desired, observed) {
        (Some(desired), Some(observed)) if same_quantity(desired, observed) => None,
        (desired, _) => desired.map(str::to_string),
    }
}
