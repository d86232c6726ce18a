//! Cluster Client
//!
//! Control-plane boundary for the MyApp controller. Child resources are
//! described with small domain models (`ChildDefinition`, `ObservedChild`,
//! `ChildPatch`) and applied through `ClusterClientTrait`, so reconciliation
//! logic never touches raw Kubernetes objects.
//!
//! # Example
//!
//! ```no_run
//! use cluster_client::{ChildKey, ChildKind, ClusterClientTrait, ClusterError, KubeClusterClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = KubeClusterClient::new(kube::Client::try_default().await?);
//!
//! let key = ChildKey::new(ChildKind::Workload, "default", "demo-podinfo");
//! match client.read_child(&key).await {
//!     Ok(observed) => println!("replicas: {:?}", observed.replicas),
//!     Err(ClusterError::NotFound(_)) => println!("{} does not exist yet", key),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Typed errors**: not-found and already-exists are distinct variants so
//!   callers can treat them as normal outcomes
//! - **Targeted patches**: only changed fields are sent; unmanaged fields survive
//! - **Mocking**: `MockClusterClient` behind the `test-util` feature

pub mod client;
pub mod error;
pub mod models;
pub mod resources;
#[path = "trait.rs"]
pub mod cluster_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::KubeClusterClient;
pub use error::ClusterError;
pub use models::*;
pub use cluster_trait::ClusterClientTrait;
#[cfg(feature = "test-util")]
pub use mock::{ClientCall, MockClusterClient};
