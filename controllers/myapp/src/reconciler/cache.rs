//! Cache Subsystem Lifecycle.
//!
//! The cache pair exists iff `cache.enabled` is set. The transition is
//! recomputed on every pass from the current flag and the current
//! observation, so a missed or replayed event cannot leave it stuck.

use super::desired::{ChildPair, PairKeys};
use super::diff::{decide, ReconcileAction};
use super::observed::Observation;
use std::fmt;

/// Observation of both cache children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheObservation {
    pub workload: Observation,
    pub service: Observation,
}

impl CacheObservation {
    /// Neither cache child exists
    #[cfg(test)]
    pub fn absent() -> Self {
        Self {
            workload: Observation::Absent,
            service: Observation::Absent,
        }
    }

    /// The pair counts as present when either child exists
    pub fn exists(&self) -> bool {
        self.workload.exists() || self.service.exists()
    }
}

/// Transition of the cache pair for one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTransition {
    /// Disabled and not observed
    StayAbsent,
    /// Enabled and not observed
    Provision,
    /// Disabled but observed
    Decommission,
    /// Enabled and observed; check for drift
    Maintain,
}

impl CacheTransition {
    pub fn between(enabled: bool, observed_exists: bool) -> Self {
        match (enabled, observed_exists) {
            (false, false) => CacheTransition::StayAbsent,
            (true, false) => CacheTransition::Provision,
            (false, true) => CacheTransition::Decommission,
            (true, true) => CacheTransition::Maintain,
        }
    }
}

impl fmt::Display for CacheTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CacheTransition::StayAbsent => "Absent->Absent",
            CacheTransition::Provision => "Absent->Present",
            CacheTransition::Decommission => "Present->Absent",
            CacheTransition::Maintain => "Present->Present",
        };
        f.write_str(s)
    }
}

/// Actions for the cache pair.
///
/// `desired` is the cache slot of the desired state; `keys` name the cache
/// children regardless of whether the cache is enabled.
pub fn plan(
    desired: Option<&ChildPair>,
    keys: &PairKeys,
    observed: &CacheObservation,
) -> (CacheTransition, Vec<ReconcileAction>) {
    let transition = CacheTransition::between(desired.is_some(), observed.exists());

    let actions = match (transition, desired) {
        (CacheTransition::Provision, Some(pair)) => vec![
            ReconcileAction::Create(pair.workload.clone()),
            ReconcileAction::Create(pair.service.clone()),
        ],
        // A half-present pair takes the drift path: the missing child
        // decides to Create.
        (CacheTransition::Maintain, Some(pair)) => vec![
            decide(&pair.workload, &observed.workload),
            decide(&pair.service, &observed.service),
        ],
        (CacheTransition::Decommission, _) => vec![
            ReconcileAction::Delete(keys.service.clone()),
            ReconcileAction::Delete(keys.workload.clone()),
        ],
        _ => Vec::new(),
    };

    let actions = actions.into_iter().filter(|a| !a.is_noop()).collect();
    (transition, actions)
}
