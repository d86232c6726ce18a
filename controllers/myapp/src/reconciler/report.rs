//! Per-pass outcome reporting.
//!
//! A pass never stops at the first failed child. Every applied action and
//! every failure is collected here, and the dispatcher decides afterwards
//! whether the pass counts as clean.

use cluster_client::{ChildKey, ChildOperation};
use std::collections::BTreeMap;
use std::fmt;

/// What happened to one child during a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    /// Create replayed against an existing child
    AlreadyExisted,
    Patched,
    Deleted,
    /// Delete issued against a child that was already gone
    AlreadyAbsent,
}

/// A child operation that took effect (or was already in effect)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedAction {
    pub key: ChildKey,
    pub outcome: Outcome,
}

/// A child operation that failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildFailure {
    pub key: ChildKey,
    pub operation: ChildOperation,
    pub message: String,
}

impl fmt::Display for ChildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.operation, self.key, self.message)
    }
}

/// Aggregated result of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub applied: Vec<AppliedAction>,
    pub failures: Vec<ChildFailure>,
}

impl PassReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: ChildKey, outcome: Outcome) {
        self.applied.push(AppliedAction { key, outcome });
    }

    pub fn record_failure(
        &mut self,
        key: ChildKey,
        operation: ChildOperation,
        message: impl Into<String>,
    ) {
        self.failures.push(ChildFailure {
            key,
            operation,
            message: message.into(),
        });
    }

    /// Whether any child operation failed
    pub fn is_partial_failure(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Keys of children that reached `outcome`, in application order
    pub fn keys_with(&self, outcome: Outcome) -> Vec<&ChildKey> {
        self.applied
            .iter()
            .filter(|a| a.outcome == outcome)
            .map(|a| &a.key)
            .collect()
    }

    /// Last error message per failed child
    pub fn last_errors(&self) -> BTreeMap<&ChildKey, &str> {
        self.failures
            .iter()
            .map(|f| (&f.key, f.message.as_str()))
            .collect()
    }

    /// One-line summary of all failures
    pub fn failure_summary(&self) -> String {
        self.failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}
