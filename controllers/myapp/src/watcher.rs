//! Kubernetes resource watcher and event dispatcher.
//!
//! Watches MyAppResource objects with `kube_runtime::Controller` and turns
//! each delivery into an `on_create`, `on_update` or `on_delete` call.
//!
//! The last successfully handled spec is kept in an annotation on the
//! parent, so a delivery is a create when the annotation is missing and an
//! update (against the recorded spec) otherwise. A finalizer keeps the
//! parent around until its children have been deleted.

use crate::backoff::BackoffRegistry;
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::reconciler::{Outcome, ParentEventHandler, ParentSpec, PassReport};
use crds::{MyAppResource, MyAppResourceSpec};
use futures::StreamExt;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, Resource, ResourceExt};
use kube_runtime::{
    controller::{Action, Config as RuntimeConfig},
    watcher, Controller,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const FINALIZER: &str = "my.api.group/myapp-finalizer";
pub const LAST_HANDLED_ANNOTATION: &str = "my.api.group/last-handled-spec";

/// Event kind derived from a delivered parent
#[derive(Debug, Clone, PartialEq)]
pub enum ParentEvent {
    /// Never handled successfully before
    Create,
    /// Handled before; carries the last handled spec
    Update(MyAppResourceSpec),
    /// Marked for deletion
    Delete,
}

/// Classify a delivered parent
pub fn classify(resource: &MyAppResource) -> ParentEvent {
    if resource.meta().deletion_timestamp.is_some() {
        return ParentEvent::Delete;
    }
    match last_handled_spec(resource) {
        Some(old) => ParentEvent::Update(old),
        None => ParentEvent::Create,
    }
}

/// Spec recorded by the last clean pass. An unreadable annotation counts as
/// missing, which replays the idempotent create path.
pub fn last_handled_spec(resource: &MyAppResource) -> Option<MyAppResourceSpec> {
    let raw = resource.annotations().get(LAST_HANDLED_ANNOTATION)?;
    match serde_json::from_str(raw) {
        Ok(spec) => Some(spec),
        Err(e) => {
            warn!(
                "Ignoring unreadable {} annotation on {}: {}",
                LAST_HANDLED_ANNOTATION,
                resource.name_any(),
                e
            );
            None
        }
    }
}

pub fn has_finalizer(resource: &MyAppResource) -> bool {
    resource.finalizers().iter().any(|f| f == FINALIZER)
}

fn finalizer_patch(resource: &MyAppResource, keep_ours: bool) -> serde_json::Value {
    let mut finalizers: Vec<String> = resource
        .finalizers()
        .iter()
        .filter(|f| *f != FINALIZER)
        .cloned()
        .collect();
    if keep_ours {
        finalizers.push(FINALIZER.to_string());
    }
    serde_json::json!({ "metadata": { "finalizers": finalizers } })
}

fn last_handled_patch(spec: &MyAppResourceSpec) -> Result<serde_json::Value, ControllerError> {
    let recorded = serde_json::to_string(spec)?;
    Ok(serde_json::json!({
        "metadata": { "annotations": { LAST_HANDLED_ANNOTATION: recorded } }
    }))
}

/// Merge-patch parent metadata. Returns `false` when the parent is gone.
async fn patch_metadata(
    api: &Api<MyAppResource>,
    name: &str,
    patch: &serde_json::Value,
) -> Result<bool, ControllerError> {
    match api
        .patch(name, &PatchParams::default(), &Patch::Merge(patch))
        .await
    {
        Ok(_) => Ok(true),
        Err(kube::Error::Api(e)) if e.code == 404 => {
            debug!("MyAppResource {} already gone", name);
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// Turn a partially failed pass into an error so the dispatcher retries
fn check_report(parent: &ParentSpec, report: &PassReport) -> Result<(), ControllerError> {
    if !report.is_partial_failure() {
        return Ok(());
    }
    for (key, message) in report.last_errors() {
        warn!("MyAppResource {}: {} failed: {}", parent.key(), key, message);
    }
    Err(ControllerError::PartialFailure(report.failure_summary()))
}

/// Shared context of every reconcile call
pub struct Dispatcher {
    handler: Arc<dyn ParentEventHandler>,
    client: Client,
    config: ControllerConfig,
    backoff: BackoffRegistry,
}

impl Dispatcher {
    pub fn new(
        handler: Arc<dyn ParentEventHandler>,
        client: Client,
        config: ControllerConfig,
    ) -> Self {
        Self {
            handler,
            client,
            config,
            backoff: BackoffRegistry::new(),
        }
    }

    fn parent_key(&self, resource: &MyAppResource) -> String {
        format!(
            "{}/{}",
            resource
                .namespace()
                .unwrap_or_else(|| self.config.default_namespace().to_string()),
            resource.name_any()
        )
    }

    /// Handle one delivery of `resource`
    pub async fn dispatch(&self, resource: &MyAppResource) -> Result<Action, ControllerError> {
        let parent = ParentSpec::from_resource(resource, self.config.default_namespace())?;
        let api: Api<MyAppResource> = Api::namespaced(self.client.clone(), &parent.namespace);

        let event = classify(resource);
        if event == ParentEvent::Delete {
            return self.finalize(&api, resource, &parent).await;
        }

        if !has_finalizer(resource) {
            info!("Adding finalizer to MyAppResource {}", parent.key());
            if !patch_metadata(&api, &parent.name, &finalizer_patch(resource, true)).await? {
                return Ok(Action::await_change());
            }
        }

        let (report, already_recorded) = match &event {
            ParentEvent::Update(old) => {
                let report = self
                    .handler
                    .on_update(&parent.with_spec(old.clone()), &parent)
                    .await?;
                (report, *old == parent.spec)
            }
            _ => (self.handler.on_create(&parent).await?, false),
        };
        check_report(&parent, &report)?;

        if !already_recorded {
            debug!("Recording handled spec on MyAppResource {}", parent.key());
            patch_metadata(&api, &parent.name, &last_handled_patch(&parent.spec)?).await?;
        }

        self.finish_clean_pass(&parent, &report);
        Ok(Action::requeue(self.config.resync_interval))
    }

    fn finish_clean_pass(&self, parent: &ParentSpec, report: &PassReport) {
        let key = parent.key();
        let failures = self.backoff.error_count(&key);
        if failures > 0 {
            info!("MyAppResource {} recovered after {} failed attempts", key, failures);
        }
        self.backoff.reset(&key);

        if !report.applied.is_empty() {
            info!(
                "MyAppResource {} reconciled: {} created, {} patched, {} deleted",
                key,
                report.keys_with(Outcome::Created).len(),
                report.keys_with(Outcome::Patched).len(),
                report.keys_with(Outcome::Deleted).len()
            );
        }
    }

    async fn finalize(
        &self,
        api: &Api<MyAppResource>,
        resource: &MyAppResource,
        parent: &ParentSpec,
    ) -> Result<Action, ControllerError> {
        if !has_finalizer(resource) {
            return Ok(Action::await_change());
        }

        let report = self.handler.on_delete(parent).await?;
        check_report(parent, &report)?;

        info!("Children of MyAppResource {} deleted, removing finalizer", parent.key());
        patch_metadata(api, &parent.name, &finalizer_patch(resource, false)).await?;
        self.finish_clean_pass(parent, &report);
        self.backoff.forget(&parent.key());
        Ok(Action::await_change())
    }
}

async fn reconcile(
    resource: Arc<MyAppResource>,
    ctx: Arc<Dispatcher>,
) -> Result<Action, ControllerError> {
    debug!("Reconciling MyAppResource {}", ctx.parent_key(&resource));
    ctx.dispatch(&resource).await
}

fn error_policy(resource: Arc<MyAppResource>, error: &ControllerError, ctx: Arc<Dispatcher>) -> Action {
    let key = ctx.parent_key(&resource);
    let (delay, error_count) = ctx.backoff.record_failure(&key);
    error!(
        "Reconciliation of MyAppResource {} failed (attempt {}), retrying in {}s: {}",
        key,
        error_count,
        delay.as_secs(),
        error
    );
    Action::requeue(delay)
}

/// Watches MyAppResource objects.
pub struct Watcher {
    dispatcher: Arc<Dispatcher>,
    api: Api<MyAppResource>,
    config: ControllerConfig,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(dispatcher: Arc<Dispatcher>, api: Api<MyAppResource>, config: ControllerConfig) -> Self {
        Self {
            dispatcher,
            api,
            config,
        }
    }

    /// Runs the watch loop until the stream ends
    pub async fn watch_parents(&self) -> Result<(), ControllerError> {
        info!("Starting MyAppResource watcher");

        let runtime_config = RuntimeConfig::default()
            .debounce(self.config.debounce)
            .concurrency(self.config.concurrency);

        Controller::new(self.api.clone(), watcher::Config::default())
            .with_config(runtime_config)
            .run(reconcile, error_policy, self.dispatcher.clone())
            .for_each(|res| async move {
                match res {
                    Ok((obj, _)) => debug!("Reconciled MyAppResource {}", obj.name),
                    Err(e) => error!("MyAppResource controller error: {}", e),
                }
            })
            .await;

        Err(ControllerError::Watch(
            "MyAppResource watch stream ended".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

    #[test]
    fn test_new_parent_is_create() {
        let resource = test_resource(TEST_NAME, scenario_spec());
        assert_eq!(classify(&resource), ParentEvent::Create);
    }

    #[test]
    fn test_recorded_spec_is_update() {
        let mut old = scenario_spec();
        old.replica_count = Some(2);
        let mut resource = test_resource(TEST_NAME, scenario_spec());
        resource.annotations_mut().insert(
            LAST_HANDLED_ANNOTATION.to_string(),
            serde_json::to_string(&old).unwrap(),
        );

        assert_eq!(classify(&resource), ParentEvent::Update(old));
    }

    #[test]
    fn test_unreadable_annotation_is_create() {
        let mut resource = test_resource(TEST_NAME, scenario_spec());
        resource
            .annotations_mut()
            .insert(LAST_HANDLED_ANNOTATION.to_string(), "{not json".to_string());

        assert_eq!(classify(&resource), ParentEvent::Create);
    }

    #[test]
    fn test_deletion_timestamp_is_delete() {
        let mut resource = test_resource(TEST_NAME, scenario_spec());
        resource.metadata.deletion_timestamp = Some(Time(Default::default()));
        assert_eq!(classify(&resource), ParentEvent::Delete);
    }

    #[test]
    fn test_last_handled_patch_round_trips() {
        let spec = scenario_spec();
        let patch = last_handled_patch(&spec).unwrap();
        let raw = patch["metadata"]["annotations"][LAST_HANDLED_ANNOTATION]
            .as_str()
            .unwrap();

        let mut resource = test_resource(TEST_NAME, spec.clone());
        resource
            .annotations_mut()
            .insert(LAST_HANDLED_ANNOTATION.to_string(), raw.to_string());
        assert_eq!(last_handled_spec(&resource), Some(spec));
    }

    #[test]
    fn test_finalizer_patch_keeps_foreign_finalizers() {
        let mut resource = test_resource(TEST_NAME, scenario_spec());
        resource.metadata.finalizers = Some(vec!["other.io/guard".to_string()]);
        assert!(!has_finalizer(&resource));

        let added = finalizer_patch(&resource, true);
        assert_eq!(
            added["metadata"]["finalizers"],
            serde_json::json!(["other.io/guard", FINALIZER])
        );

        resource.finalizers_mut().push(FINALIZER.to_string());
        assert!(has_finalizer(&resource));
        let removed = finalizer_patch(&resource, false);
        assert_eq!(
            removed["metadata"]["finalizers"],
            serde_json::json!(["other.io/guard"])
        );
    }

    #[test]
    fn test_partial_report_becomes_error() {
        use cluster_client::{ChildKey, ChildKind, ChildOperation};

        let parent = test_parent(false);
        let mut report = PassReport::new();
        assert!(check_report(&parent, &report).is_ok());

        report.record_failure(
            ChildKey::new(ChildKind::Workload, TEST_NAMESPACE, "demo-podinfo"),
            ChildOperation::Patch,
            "conflict",
        );
        assert!(matches!(
            check_report(&parent, &report),
            Err(ControllerError::PartialFailure(_))
        ));
    }
}
