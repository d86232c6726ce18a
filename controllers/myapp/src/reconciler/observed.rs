//! Observed-State Reader.
//!
//! Reads children by their derived names. A missing child is a normal
//! observation; only transport and authorization failures are errors.

use cluster_client::{ChildKey, ClusterClientTrait, ClusterError, ObservedChild};
use tracing::debug;

/// Live state of one child, or its absence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Present(ObservedChild),
    Absent,
}

impl Observation {
    pub fn exists(&self) -> bool {
        matches!(self, Observation::Present(_))
    }

    pub fn as_present(&self) -> Option<&ObservedChild> {
        match self {
            Observation::Present(observed) => Some(observed),
            Observation::Absent => None,
        }
    }
}

/// Read one child by key
pub async fn read(
    client: &(dyn ClusterClientTrait + Send + Sync),
    key: &ChildKey,
) -> Result<Observation, ClusterError> {
    match client.read_child(key).await {
        Ok(observed) => Ok(Observation::Present(observed)),
        Err(e) if e.is_not_found() => {
            debug!("{} not found", key);
            Ok(Observation::Absent)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cluster_client::{ChildKind, ChildOperation, MockClusterClient, ResourceRequests};

    fn service_key() -> ChildKey {
        ChildKey::new(ChildKind::Service, "apps", "demo-podinfo-svc")
    }

    #[tokio::test]
    async fn test_missing_child_is_absent() {
        let mock = MockClusterClient::new();
        let observation = read(&mock, &service_key()).await.unwrap();
        assert_eq!(observation, Observation::Absent);
        assert!(!observation.exists());
    }

    #[tokio::test]
    async fn test_existing_child_is_present() {
        let mock = MockClusterClient::new();
        let observed = ObservedChild {
            key: service_key(),
            container: None,
            image: None,
            replicas: None,
            resources: ResourceRequests::default(),
            env: Vec::new(),
            port: Some(8080),
            target_port: Some(9898),
        };
        mock.insert(observed.clone());

        let observation = read(&mock, &service_key()).await.unwrap();
        assert_eq!(observation.as_present(), Some(&observed));
    }

    #[tokio::test]
    async fn test_transport_failure_is_an_error() {
        let mock = MockClusterClient::new();
        mock.fail_on(ChildOperation::Read, service_key());

        let err = read(&mock, &service_key()).await.unwrap_err();
        assert!(matches!(err, ClusterError::Transport(_)));
    }
}
