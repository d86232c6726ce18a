//! Reconciliation Engine.
//!
//! Sequences child operations for create, update and delete events.
//! Each child is handled independently: a failure is recorded in the
//! pass report and the remaining children are still processed.

use super::cache::{self, CacheObservation, CacheTransition};
use super::cascade;
use super::desired::{self, ChildKeys, ChildPair, DesiredState, PairKeys};
use super::diff::{decide, ReconcileAction};
use super::{ParentEventHandler, ParentSpec, PassReport, Reconciler};
use crate::error::ControllerError;
use crate::reconcile_helpers::{apply_all, observe};
use async_trait::async_trait;
use tracing::{debug, info};

#[async_trait]
impl ParentEventHandler for Reconciler {
    async fn on_create(&self, parent: &ParentSpec) -> Result<PassReport, ControllerError> {
        let desired = desired::build(parent)?;
        info!(
            "Creating children for MyAppResource {} (cache enabled: {})",
            parent.key(),
            desired.cache.is_some()
        );

        // An earlier partial pass may have left children of an older spec.
        Ok(self.converge(parent, &desired).await)
    }

    async fn on_update(
        &self,
        old: &ParentSpec,
        new: &ParentSpec,
    ) -> Result<PassReport, ControllerError> {
        if old == new {
            debug!("MyAppResource {} unchanged, nothing to do", new.key());
            return Ok(PassReport::new());
        }

        let desired = desired::build(new)?;
        Ok(self.converge(new, &desired).await)
    }

    async fn on_delete(&self, parent: &ParentSpec) -> Result<PassReport, ControllerError> {
        Ok(cascade::cascade(self.client(), parent).await)
    }
}

impl Reconciler {
    /// Observe every child of `parent` and apply what it takes to reach `desired`
    async fn converge(&self, parent: &ParentSpec, desired: &DesiredState) -> PassReport {
        let keys = ChildKeys::for_parent(parent);
        let mut report = PassReport::new();

        let primary_actions = self
            .primary_actions(&desired.primary, &keys.primary, &mut report)
            .await;

        let cache_plan = self
            .observe_cache(&keys.cache, &mut report)
            .await
            .map(|observed| cache::plan(desired.cache.as_ref(), &keys.cache, &observed));

        match cache_plan {
            Some((transition, cache_actions)) => {
                debug!(
                    "Cache transition for MyAppResource {}: {}",
                    parent.key(),
                    transition
                );
                // Clear the cache address before removing the cache; create the
                // cache before pointing the primary at it.
                if transition == CacheTransition::Decommission {
                    apply_all(self.client(), &primary_actions, &mut report).await;
                    apply_all(self.client(), &cache_actions, &mut report).await;
                } else {
                    apply_all(self.client(), &cache_actions, &mut report).await;
                    apply_all(self.client(), &primary_actions, &mut report).await;
                }
            }
            None => apply_all(self.client(), &primary_actions, &mut report).await,
        }

        report
    }

    /// Diff the primary pair against what is live
    async fn primary_actions(
        &self,
        desired: &ChildPair,
        keys: &PairKeys,
        report: &mut PassReport,
    ) -> Vec<ReconcileAction> {
        let mut actions = Vec::new();
        for (definition, key) in [
            (&desired.workload, &keys.workload),
            (&desired.service, &keys.service),
        ] {
            if let Some(observed) = observe(self.client(), key, report).await {
                let action = decide(definition, &observed);
                if !action.is_noop() {
                    actions.push(action);
                }
            }
        }
        actions
    }

    /// Observe both cache children; `None` if either read failed
    async fn observe_cache(
        &self,
        keys: &PairKeys,
        report: &mut PassReport,
    ) -> Option<CacheObservation> {
        let workload = observe(self.client(), &keys.workload, report).await;
        let service = observe(self.client(), &keys.service, report).await;
        Some(CacheObservation {
            workload: workload?,
            service: service?,
        })
    }
}
