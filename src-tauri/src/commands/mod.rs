pub mod deploy;
pub mod resources;
pub mod values;

use std::sync::Arc;

use serde::Serialize;
use tauri::{AppHandle, Emitter};

use crate::actions::{DeployTrigger, Navigator, Route};
use crate::client::ResourceClient;
use crate::config::{self, ConsoleConfig};
use crate::sync::{DependencyMap, Forwarders, Synchronizer};

// ── managed state ─────────────────────────────────────────────────────────────

/// Tauri managed state: one synchronizer and deploy trigger per window session.
pub struct ConsoleState {
    pub config: &'static ConsoleConfig,
    pub sync: Synchronizer,
    pub deploy: DeployTrigger,
    /// Tasks forwarding cache entries to the webview, by subscription id.
    pub(crate) forwarders: Forwarders,
}

impl ConsoleState {
    /// Builds the session from the installed process configuration.
    pub fn new(app: AppHandle) -> Result<Self, String> {
        let config = config::get();
        let client = ResourceClient::from_config(config).map_err(|e| e.to_string())?;
        let sync = Synchronizer::new(client.clone());
        let deploy = DeployTrigger::new(
            client,
            sync.clone(),
            Arc::new(WebviewNavigator(app)),
            Arc::new(DependencyMap::new()),
            config.deploy_method,
        );

        Ok(Self {
            config,
            sync,
            deploy,
            forwarders: Forwarders::default(),
        })
    }
}

// ── navigation ────────────────────────────────────────────────────────────────

#[derive(Clone, Serialize)]
struct NavigateEvent {
    path: String,
    route: Route,
}

/// Emits `navigate` with payload `{ path, route }` for the webview router.
pub struct WebviewNavigator(pub AppHandle);

impl Navigator for WebviewNavigator {
    fn navigate(&self, route: Route) {
        let event = NavigateEvent {
            path: route.path(),
            route,
        };
        if let Err(e) = self.0.emit("navigate", event) {
            log::warn!("navigate: emit failed: {e}");
        }
    }
}
