//! Main controller implementation.
//!
//! Wires the Kubernetes client, the child-resource client, the reconciler
//! and the watcher together, then runs the watch loop until it exits or the
//! process is asked to stop.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::reconciler::{ParentEventHandler, Reconciler};
use crate::watcher::{Dispatcher, Watcher};
use cluster_client::KubeClusterClient;
use crds::MyAppResource;
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Main controller for MyAppResource management.
pub struct Controller {
    parent_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts its watcher.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing MyApp Controller");

        let kube_client = Client::try_default().await?;

        let cluster_client = KubeClusterClient::new(kube_client.clone());
        let handler: Arc<dyn ParentEventHandler> = Arc::new(Reconciler::new(cluster_client));

        let api: Api<MyAppResource> = match &config.watch_namespace {
            Some(ns) => Api::namespaced(kube_client.clone(), ns),
            None => Api::all(kube_client.clone()),
        };

        let dispatcher = Arc::new(Dispatcher::new(handler, kube_client, config.clone()));
        let watcher = Watcher::new(dispatcher, api, config);

        let parent_watcher = tokio::spawn(async move { watcher.watch_parents().await });

        Ok(Self { parent_watcher })
    }

    /// Runs the controller until the watcher exits or a shutdown signal arrives.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("MyApp Controller running");

        tokio::select! {
            result = &mut self.parent_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("MyAppResource watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("MyAppResource watcher error: {}", e)))?;
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!("Failed to listen for shutdown signal: {}", e);
                }
                info!("Shutdown signal received, stopping MyApp Controller");
                self.parent_watcher.abort();
            }
        }

        Ok(())
    }
}
