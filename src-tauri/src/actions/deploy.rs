use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use super::navigation::{Navigator, Route};
use crate::client::ResourceClient;
use crate::config::DeployMethod;
use crate::error::ActionError;
use crate::models::{ResourceId, ResourceKey};
use crate::sync::{DependencyMap, Synchronizer};

/// Per-app state of the deploy action. Only `InFlight` blocks the control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum ActionPhase {
    Idle,
    InFlight,
    Succeeded { deployment: ResourceId },
    Failed { error: String },
}

impl ActionPhase {
    pub fn is_blocking(&self) -> bool {
        matches!(self, ActionPhase::InFlight)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployOutcome {
    pub deployment: ResourceId,
    pub route: Route,
}

pub fn deploy_path(app_id: &ResourceId) -> String {
    format!("/app/{app_id}/deploy/")
}

type Phases = Mutex<HashMap<ResourceId, ActionPhase>>;

fn lock(phases: &Phases) -> MutexGuard<'_, HashMap<ResourceId, ActionPhase>> {
    phases.lock().unwrap_or_else(|p| p.into_inner())
}

/// Holds an app's in-flight slot; returns it to `Idle` if dropped unsettled.
struct InFlightGuard<'a> {
    phases: &'a Phases,
    app_id: ResourceId,
    settled: bool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(phases: &'a Phases, app_id: &ResourceId) -> Result<Self, ActionError> {
        let mut map = lock(phases);
        let phase = map.entry(app_id.clone()).or_insert(ActionPhase::Idle);
        if phase.is_blocking() {
            return Err(ActionError::InFlight);
        }
        *phase = ActionPhase::InFlight;
        Ok(Self {
            phases,
            app_id: app_id.clone(),
            settled: false,
        })
    }

    fn settle(mut self, phase: ActionPhase) {
        lock(self.phases).insert(self.app_id.clone(), phase);
        self.settled = true;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            log::warn!("deploy: app {} trigger dropped before settling", self.app_id);
            lock(self.phases).insert(self.app_id.clone(), ActionPhase::Idle);
        }
    }
}

/// Triggers deployments and reconciles the console afterwards: navigates to
/// the new deployment and invalidates every cached record that depends on the
/// app.
#[derive(Clone)]
pub struct DeployTrigger {
    client: ResourceClient,
    sync: Synchronizer,
    navigator: Arc<dyn Navigator>,
    dependencies: Arc<DependencyMap>,
    method: DeployMethod,
    phases: Arc<Phases>,
}

impl DeployTrigger {
    pub fn new(
        client: ResourceClient,
        sync: Synchronizer,
        navigator: Arc<dyn Navigator>,
        dependencies: Arc<DependencyMap>,
        method: DeployMethod,
    ) -> Self {
        Self {
            client,
            sync,
            navigator,
            dependencies,
            method,
            phases: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Deploys `app_id`. Rejected with [`ActionError::InFlight`] and no remote
    /// call while a deploy for the same app is running.
    pub async fn trigger(&self, app_id: &ResourceId) -> Result<DeployOutcome, ActionError> {
        let guard = InFlightGuard::acquire(&self.phases, app_id).inspect_err(|_| {
            log::info!("deploy: app {app_id} already deploying, ignoring trigger");
        })?;

        log::info!("deploy: triggering app {app_id}");
        let response = self
            .client
            .invoke(self.method.as_http(), &deploy_path(app_id))
            .await;

        let outcome = match response {
            Ok(body) => {
                let done = deployment_id(&body).map(|deployment| DeployOutcome {
                    route: Route::Deployment(deployment.clone()),
                    deployment,
                });
                if let Some(done) = &done {
                    self.navigator.navigate(done.route.clone());
                }
                // The server acted even when the body carries no id.
                self.invalidate_dependents(app_id);
                done.ok_or(ActionError::MissingIdentifier)
            }
            Err(err) => Err(ActionError::Remote(err)),
        };

        match &outcome {
            Ok(done) => {
                log::info!("deploy: app {app_id} -> deployment {}", done.deployment);
                guard.settle(ActionPhase::Succeeded {
                    deployment: done.deployment.clone(),
                });
            }
            Err(err) => {
                log::error!("deploy: app {app_id} failed: {err}");
                guard.settle(ActionPhase::Failed {
                    error: err.to_string(),
                });
            }
        }
        outcome
    }

    pub fn state(&self, app_id: &ResourceId) -> ActionPhase {
        lock(&self.phases)
            .get(app_id)
            .cloned()
            .unwrap_or(ActionPhase::Idle)
    }

    /// Returns a settled action to `Idle`. No effect while in flight.
    pub fn reset(&self, app_id: &ResourceId) -> bool {
        let mut map = lock(&self.phases);
        match map.get(app_id) {
            Some(phase) if phase.is_blocking() => false,
            _ => {
                map.remove(app_id);
                true
            }
        }
    }

    fn invalidate_dependents(&self, app_id: &ResourceId) {
        let source = ResourceKey::Application(app_id.clone());
        for key in self.dependencies.dependents_of(&source) {
            // Fire and forget: the gate must not wait on follow-up reads.
            let _ = self.sync.invalidate(&key);
        }
    }
}

fn deployment_id(body: &serde_json::Value) -> Option<ResourceId> {
    let id = body.get("id")?;
    serde_json::from_value(id.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, FetchErrorKind};
    use crate::sync::{EntryStatus, SubscribeConfig};
    use crate::testing::{settle, ScriptedTransport};
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct Harness {
        transport: Arc<ScriptedTransport>,
        sync: Synchronizer,
        trigger: DeployTrigger,
        routes: mpsc::UnboundedReceiver<Route>,
    }

    fn harness() -> Harness {
        let transport = Arc::new(ScriptedTransport::default());
        let client = ResourceClient::new(transport.clone(), Duration::from_secs(5));
        let sync = Synchronizer::new(client.clone());
        let (tx, routes) = mpsc::unbounded_channel();
        let trigger = DeployTrigger::new(
            client,
            sync.clone(),
            Arc::new(tx),
            Arc::new(DependencyMap::new()),
            DeployMethod::Get,
        );
        Harness {
            transport,
            sync,
            trigger,
            routes,
        }
    }

    fn app(replicas: u32) -> serde_json::Value {
        json!({
            "id": 1,
            "name": "web",
            "namespace": "default",
            "image": "nginx:1.27",
            "replicas": replicas,
            "port": 80,
            "environment_variables": {},
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-01T10:00:00Z",
            "deployments": []
        })
    }

    #[tokio::test(start_paused = true)]
    async fn second_trigger_while_in_flight_is_rejected_without_a_call() {
        let h = harness();
        let app_id = ResourceId::from(1);
        let path = deploy_path(&app_id);
        let release = h.transport.gate(&path);

        let first = tokio::spawn({
            let trigger = h.trigger.clone();
            let app_id = app_id.clone();
            async move { trigger.trigger(&app_id).await }
        });
        settle().await;
        assert_eq!(h.trigger.state(&app_id), ActionPhase::InFlight);

        let again = h.trigger.trigger(&app_id).await;
        assert_eq!(again, Err(ActionError::InFlight));
        assert_eq!(h.transport.calls(&path), 1);
        assert_eq!(h.trigger.state(&app_id), ActionPhase::InFlight);

        release.send(Ok(json!({"id": 12, "status": "in-progress"}))).unwrap();
        let outcome = first.await.unwrap().unwrap();
        assert_eq!(outcome.deployment, ResourceId::from(12));
        assert!(!h.trigger.state(&app_id).is_blocking());
    }

    #[tokio::test(start_paused = true)]
    async fn success_navigates_and_revalidates_the_app() {
        let mut h = harness();
        let app_id = ResourceId::from(1);
        let app_key = ResourceKey::application(1);
        h.transport.reply(&app_key.path(), Ok(app(1)));
        h.transport.reply(&app_key.path(), Ok(app(3)));
        h.transport.reply(&deploy_path(&app_id), Ok(json!({"id": 40})));

        let mut view = h.sync.subscribe(SubscribeConfig::once(app_key.clone()));
        view.wait_for(|e| e.status == EntryStatus::Ready).await.unwrap();

        let outcome = h.trigger.trigger(&app_id).await.unwrap();
        assert_eq!(outcome.route.path(), "/deployments/40");
        assert_eq!(h.routes.try_recv().unwrap(), Route::Deployment(ResourceId::from(40)));
        assert_eq!(
            h.trigger.state(&app_id),
            ActionPhase::Succeeded { deployment: ResourceId::from(40) }
        );
        assert_eq!(h.transport.methods(&deploy_path(&app_id)), vec![http::Method::GET]);

        let refreshed = view
            .wait_for(|e| {
                e.data
                    .as_ref()
                    .and_then(|r| r.as_application())
                    .is_some_and(|a| a.replicas == 3)
            })
            .await
            .unwrap();
        assert_eq!(refreshed.status, EntryStatus::Ready);
        assert_eq!(h.transport.calls(&app_key.path()), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_lands_after_the_app_view_unmounts_on_navigation() {
        let mut h = harness();
        let app_id = ResourceId::from(1);
        let app_key = ResourceKey::application(1);
        h.transport.reply(&app_key.path(), Ok(app(1)));
        h.transport.reply_after(&app_key.path(), Duration::from_millis(200), Ok(app(3)));
        h.transport.reply(&deploy_path(&app_id), Ok(json!({"id": 40})));

        let mut view = h.sync.subscribe(SubscribeConfig::once(app_key.clone()));
        view.wait_for(|e| e.status == EntryStatus::Ready).await.unwrap();

        h.trigger.trigger(&app_id).await.unwrap();
        assert_eq!(h.routes.try_recv().unwrap(), Route::Deployment(ResourceId::from(40)));
        // The webview follows the route and the app view goes away.
        drop(view);

        tokio::time::sleep(Duration::from_millis(300)).await;
        settle().await;

        let entry = h.sync.entry(&app_key).unwrap();
        let replicas = entry.data.as_ref().and_then(|r| r.as_application()).map(|a| a.replicas);
        assert_eq!(h.transport.calls(&app_key.path()), 2);
        assert_eq!(replicas, Some(3));
        assert_eq!(entry.status, EntryStatus::Ready);
        assert!(!entry.validating);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_releases_the_gate_without_navigating() {
        let mut h = harness();
        let app_id = ResourceId::from(1);
        let path = deploy_path(&app_id);
        h.transport.reply(
            &path,
            Err(FetchError::new(&path, FetchErrorKind::Status(500), "helm exploded")),
        );

        let err = h.trigger.trigger(&app_id).await.unwrap_err();
        assert!(matches!(err, ActionError::Remote(ref e) if e.kind == FetchErrorKind::Status(500)));
        assert!(h.routes.try_recv().is_err());

        let state = h.trigger.state(&app_id);
        assert!(matches!(state, ActionPhase::Failed { .. }));
        assert!(!state.is_blocking());

        // Retry is allowed straight away.
        h.transport.reply(&path, Ok(json!({"id": 2})));
        assert!(h.trigger.trigger(&app_id).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_identifier_is_an_error_but_still_invalidates() {
        let mut h = harness();
        let app_id = ResourceId::from(1);
        let status_key = ResourceKey::application_status(1);
        h.transport.always(&status_key.path(), json!({"running": true}));
        h.transport.reply(&deploy_path(&app_id), Ok(json!({"status": "queued"})));

        h.sync.revalidate(&status_key).await;
        let err = h.trigger.trigger(&app_id).await.unwrap_err();
        assert_eq!(err, ActionError::MissingIdentifier);
        assert!(h.routes.try_recv().is_err());
        assert!(!h.trigger.state(&app_id).is_blocking());

        settle().await;
        assert_eq!(h.transport.calls(&status_key.path()), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_trigger_returns_to_idle() {
        let h = harness();
        let app_id = ResourceId::from(5);
        let _never = h.transport.gate(&deploy_path(&app_id));

        let task = tokio::spawn({
            let trigger = h.trigger.clone();
            let app_id = app_id.clone();
            async move { trigger.trigger(&app_id).await }
        });
        settle().await;
        assert!(h.trigger.state(&app_id).is_blocking());

        task.abort();
        let _ = task.await;
        assert_eq!(h.trigger.state(&app_id), ActionPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_clears_settled_state_only() {
        let h = harness();
        let app_id = ResourceId::from(1);
        h.transport.reply(&deploy_path(&app_id), Ok(json!({"id": 3})));

        h.trigger.trigger(&app_id).await.unwrap();
        assert!(h.trigger.reset(&app_id));
        assert_eq!(h.trigger.state(&app_id), ActionPhase::Idle);
    }
}
