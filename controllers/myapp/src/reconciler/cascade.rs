//! Deletion Cascade Handler.
//!
//! Services go before the workloads behind them. The order is best effort;
//! the control plane offers no atomic multi-resource delete.

use super::desired::ChildKeys;
use super::diff::ReconcileAction;
use super::{ParentSpec, PassReport};
use crate::reconcile_helpers::apply_all;
use cluster_client::{ChildKey, ClusterClientTrait};
use tracing::info;

/// Children to delete for `parent`, in deletion order.
///
/// Cache children are included only when the spec at deletion time has
/// the cache enabled.
pub fn deletion_order(parent: &ParentSpec) -> Vec<ChildKey> {
    let keys = ChildKeys::for_parent(parent);
    let mut order = vec![keys.primary.service, keys.primary.workload];
    if parent.spec.cache_enabled() {
        order.push(keys.cache.service);
        order.push(keys.cache.workload);
    }
    order
}

/// Delete every owned child. Already-absent children count as deleted.
pub async fn cascade(
    client: &(dyn ClusterClientTrait + Send + Sync),
    parent: &ParentSpec,
) -> PassReport {
    info!("Deleting children of MyAppResource {}", parent.key());

    let actions: Vec<ReconcileAction> = deletion_order(parent)
        .into_iter()
        .map(ReconcileAction::Delete)
        .collect();

    let mut report = PassReport::new();
    apply_all(client, &actions, &mut report).await;
    report
}
