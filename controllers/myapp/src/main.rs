//! MyApp Controller
//!
//! Reconciles MyAppResource objects into their child resources:
//! - a podinfo Deployment and NodePort Service for every parent
//! - a cache Deployment and ClusterIP Service while `cache.enabled` is set
//!
//! Children are recreated, patched or deleted so the cluster converges on
//! the declared spec, and removed again when the parent is deleted.

mod backoff;
mod config;
mod controller;
mod error;
mod reconcile_helpers;
mod reconciler;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    // Configure rustls crypto provider (use ring for compatibility)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| ControllerError::InvalidConfig("Failed to install rustls crypto provider".to_string()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting MyApp Controller");

    let config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!(
        "  Namespace: {}",
        config.watch_namespace.as_deref().unwrap_or("all namespaces")
    );
    info!("  Re-sync interval: {}s", config.resync_interval.as_secs());
    info!("  Debounce: {}s", config.debounce.as_secs());
    info!("  Concurrency: {}", config.concurrency);

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
