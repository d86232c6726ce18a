//! # Fibonacci Backoff
//!
//! Retry delays for parents whose last pass failed. Delays follow the
//! Fibonacci sequence in whole minutes (1m, 1m, 2m, 3m, 5m, 8m, 10m) and are
//! capped at the configured maximum. Each parent keeps its own sequence,
//! which restarts after a clean pass.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::warn;

const MIN_MINUTES: u64 = 1;
const MAX_MINUTES: u64 = 10;

/// Fibonacci backoff calculator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FibonacciBackoff {
    min_minutes: u64,
    max_minutes: u64,
    prev_minutes: u64,
    current_minutes: u64,
}

impl FibonacciBackoff {
    /// Create a backoff starting at `min_minutes` and capped at `max_minutes`
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            min_minutes,
            max_minutes,
            prev_minutes: 0,
            current_minutes: min_minutes,
        }
    }

    /// Return the current delay and advance the sequence
    pub fn next_delay(&mut self) -> Duration {
        let delay = Duration::from_secs(self.current_minutes * 60);
        let next = self.prev_minutes + self.current_minutes;
        self.prev_minutes = self.current_minutes;
        self.current_minutes = next.min(self.max_minutes);
        delay
    }

    /// Restart the sequence
    pub fn reset(&mut self) {
        self.prev_minutes = 0;
        self.current_minutes = self.min_minutes;
    }
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new(MIN_MINUTES, MAX_MINUTES)
    }
}

/// Backoff state for one parent
#[derive(Debug, Clone, Default)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

/// Per-parent backoff tracking keyed by `namespace/name`
#[derive(Debug, Default)]
pub struct BackoffRegistry {
    states: Mutex<HashMap<String, BackoffState>>,
}

impl BackoffRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed pass for `parent_key` and return (delay, consecutive failures)
    pub fn record_failure(&self, parent_key: &str) -> (Duration, u32) {
        match self.states.lock() {
            Ok(mut states) => {
                let state = states.entry(parent_key.to_string()).or_default();
                state.error_count += 1;
                (state.backoff.next_delay(), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff states: {}, using minimum backoff", e);
                (Duration::from_secs(MIN_MINUTES * 60), 0)
            }
        }
    }

    /// Forget failures for `parent_key` after a clean pass
    pub fn reset(&self, parent_key: &str) {
        if let Ok(mut states) = self.states.lock() {
            if let Some(state) = states.get_mut(parent_key) {
                state.error_count = 0;
                state.backoff.reset();
            }
        }
    }

    /// Drop all state for `parent_key` once the parent is gone
    pub fn forget(&self, parent_key: &str) {
        if let Ok(mut states) = self.states.lock() {
            states.remove(parent_key);
        }
    }

    /// Consecutive failures currently recorded for `parent_key`
    pub fn error_count(&self, parent_key: &str) -> u32 {
        self.states
            .lock()
            .ok()
            .and_then(|states| states.get(parent_key).map(|s| s.error_count))
            .unwrap_or(0)
    }
}
