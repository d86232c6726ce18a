//! Controller configuration loaded from environment variables.

use crate::error::ControllerError;
use std::time::Duration;

const DEFAULT_RESYNC_SECS: u64 = 300;
const DEFAULT_DEBOUNCE_SECS: u64 = 1;
const DEFAULT_CONCURRENCY: u16 = 3;

/// Runtime configuration for the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace to watch; `None` watches all namespaces
    pub watch_namespace: Option<String>,
    /// Interval after which a healthy parent is reconciled again
    pub resync_interval: Duration,
    /// Quiet period after the last event before reconciling
    pub debounce: Duration,
    /// Maximum parents reconciled at the same time
    pub concurrency: u16,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            watch_namespace: None,
            resync_interval: Duration::from_secs(DEFAULT_RESYNC_SECS),
            debounce: Duration::from_secs(DEFAULT_DEBOUNCE_SECS),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from the process environment.
    ///
    /// - `WATCH_NAMESPACE`: namespace to watch (all namespaces when unset)
    /// - `RESYNC_INTERVAL_SECS`: periodic re-sync interval (default 300)
    /// - `DEBOUNCE_SECS`: event debounce (default 1)
    /// - `CONCURRENCY`: concurrent reconciliations (default 3)
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let watch_namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty());

        let resync_secs = parse_var(&lookup, "RESYNC_INTERVAL_SECS", DEFAULT_RESYNC_SECS)?;
        if resync_secs == 0 {
            return Err(ControllerError::InvalidConfig(
                "RESYNC_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }
        let debounce_secs = parse_var(&lookup, "DEBOUNCE_SECS", DEFAULT_DEBOUNCE_SECS)?;
        let concurrency = parse_var(&lookup, "CONCURRENCY", DEFAULT_CONCURRENCY)?;

        Ok(Self {
            watch_namespace,
            resync_interval: Duration::from_secs(resync_secs),
            debounce: Duration::from_secs(debounce_secs),
            concurrency,
        })
    }

    /// Namespace used for parents that carry none
    pub fn default_namespace(&self) -> &str {
        self.watch_namespace.as_deref().unwrap_or("default")
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ControllerError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            ControllerError::InvalidConfig(format!("{} has invalid value '{}'", key, raw))
        }),
    }
}
