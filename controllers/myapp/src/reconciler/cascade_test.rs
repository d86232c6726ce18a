//! Unit tests for the Deletion Cascade Handler

#[cfg(test)]
mod tests {
    use super::super::cascade::deletion_order;
    use super::super::desired::ChildKeys;
    use super::super::{Outcome, ParentEventHandler};
    use crate::test_utils::*;
    use cluster_client::{ChildOperation, ClientCall};
    use crds::CacheSpec;

    #[test]
    fn test_services_go_before_workloads() {
        let parent = test_parent(true);
        let keys = ChildKeys::for_parent(&parent);
        assert_eq!(
            deletion_order(&parent),
            vec![
                keys.primary.service,
                keys.primary.workload,
                keys.cache.service,
                keys.cache.workload,
            ]
        );
    }

    #[test]
    fn test_cache_skipped_when_disabled() {
        let parent = test_parent(false);
        let keys = ChildKeys::for_parent(&parent);
        assert_eq!(
            deletion_order(&parent),
            vec![keys.primary.service, keys.primary.workload]
        );
    }

    #[test]
    fn test_cache_included_when_enabled_by_legacy_field() {
        let mut parent = test_parent(false);
        parent.spec.cache = None;
        parent.spec.redis = Some(CacheSpec { enabled: true });
        assert_eq!(deletion_order(&parent).len(), 4);
    }

    #[tokio::test]
    async fn test_delete_removes_every_child() {
        let (reconciler, mock) = test_reconciler();
        let parent = test_parent(true);
        seed_children(&mock, &parent);

        let report = reconciler.on_delete(&parent).await.unwrap();

        assert!(!report.is_partial_failure());
        assert_eq!(report.keys_with(Outcome::Deleted).len(), 4);
        assert!(mock.keys().is_empty());
        let deletes: Vec<ClientCall> = deletion_order(&parent)
            .into_iter()
            .map(ClientCall::Delete)
            .collect();
        assert_eq!(mock.mutating_calls(), deletes);
    }

    #[tokio::test]
    async fn test_partially_deleted_children_are_tolerated() {
        let (reconciler, mock) = test_reconciler();
        let parent = test_parent(true);
        seed_children(&mock, &parent);
        let keys = ChildKeys::for_parent(&parent);
        mock.remove(&keys.cache.workload);

        let report = reconciler.on_delete(&parent).await.unwrap();

        assert!(!report.is_partial_failure());
        assert_eq!(report.keys_with(Outcome::AlreadyAbsent), vec![&keys.cache.workload]);
        assert!(mock.keys().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_delete_is_success() {
        let (reconciler, mock) = test_reconciler();
        let parent = test_parent(true);
        seed_children(&mock, &parent);

        reconciler.on_delete(&parent).await.unwrap();
        let report = reconciler.on_delete(&parent).await.unwrap();

        assert!(!report.is_partial_failure());
        assert_eq!(report.keys_with(Outcome::AlreadyAbsent).len(), 4);
    }

    #[tokio::test]
    async fn test_failed_delete_does_not_stop_siblings() {
        let (reconciler, mock) = test_reconciler();
        let parent = test_parent(true);
        seed_children(&mock, &parent);
        let keys = ChildKeys::for_parent(&parent);
        mock.fail_on(ChildOperation::Delete, keys.primary.service.clone());

        let report = reconciler.on_delete(&parent).await.unwrap();

        assert!(report.is_partial_failure());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].key, keys.primary.service);
        assert_eq!(mock.keys(), vec![keys.primary.service.clone()]);
    }
}
