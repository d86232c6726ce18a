//! Helper functions for common reconciliation patterns
//!
//! Every child operation in a pass goes through these helpers so that
//! replay tolerance (create on an existing child, delete on a missing one)
//! and per-child failure isolation are applied the same way everywhere.

use crate::reconciler::diff::{decide, ReconcileAction};
use crate::reconciler::observed::{self, Observation};
use crate::reconciler::{Outcome, PassReport};
use cluster_client::{ChildKey, ChildOperation, ChildPatch, ClusterClientTrait};
use tracing::{debug, info, warn};

/// Read one child, recording a failure instead of propagating it.
///
/// Returns `None` when the read failed, in which case the caller skips
/// every action that depends on this observation.
pub async fn observe(
    client: &(dyn ClusterClientTrait + Send + Sync),
    key: &ChildKey,
    report: &mut PassReport,
) -> Option<Observation> {
    match observed::read(client, key).await {
        Ok(observation) => Some(observation),
        Err(e) => {
            warn!("Failed to read {}: {}", key, e);
            report.record_failure(key.clone(), ChildOperation::Read, e.to_string());
            None
        }
    }
}

/// Apply one action. Failures are logged and recorded; they never abort
/// the remaining actions of the pass.
pub async fn apply_action(
    client: &(dyn ClusterClientTrait + Send + Sync),
    action: &ReconcileAction,
    report: &mut PassReport,
) {
    match action {
        ReconcileAction::NoOp => {}
        ReconcileAction::Create(definition) => {
            let key = definition.key();
            match client.create_child(definition).await {
                Ok(()) => {
                    info!("Created {}", key);
                    report.record(key, Outcome::Created);
                }
                Err(e) if e.is_already_exists() => {
                    debug!("{} already exists, converging it in place", key);
                    report.record(key.clone(), Outcome::AlreadyExisted);
                    if let Some(observation) = observe(client, &key, report).await {
                        if let ReconcileAction::Patch(patch) = decide(definition, &observation) {
                            apply_patch(client, &patch, report).await;
                        }
                    }
                }
                Err(e) => {
                    warn!("Failed to create {}: {}", key, e);
                    report.record_failure(key, ChildOperation::Create, e.to_string());
                }
            }
        }
        ReconcileAction::Patch(patch) => apply_patch(client, patch, report).await,
        ReconcileAction::Delete(key) => match client.delete_child(key).await {
            Ok(()) => {
                info!("Deleted {}", key);
                report.record(key.clone(), Outcome::Deleted);
            }
            Err(e) if e.is_not_found() => {
                debug!("{} already absent", key);
                report.record(key.clone(), Outcome::AlreadyAbsent);
            }
            Err(e) => {
                warn!("Failed to delete {}: {}", key, e);
                report.record_failure(key.clone(), ChildOperation::Delete, e.to_string());
            }
        },
    }
}

async fn apply_patch(
    client: &(dyn ClusterClientTrait + Send + Sync),
    patch: &ChildPatch,
    report: &mut PassReport,
) {
    match client.patch_child(patch).await {
        Ok(()) => {
            info!("Patched {} ({:?})", patch.key, patch.changes);
            report.record(patch.key.clone(), Outcome::Patched);
        }
        Err(e) => {
            // A child vanishing between read and patch is recreated next pass.
            warn!("Failed to patch {}: {}", patch.key, e);
            report.record_failure(patch.key.clone(), ChildOperation::Patch, e.to_string());
        }
    }
}

/// Apply actions in order
pub async fn apply_all(
    client: &(dyn ClusterClientTrait + Send + Sync),
    actions: &[ReconcileAction],
    report: &mut PassReport,
) {
    for action in actions {
        apply_action(client, action, report).await;
    }
}
