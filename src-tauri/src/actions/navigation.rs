use serde::Serialize;
use tokio::sync::mpsc;

use crate::models::ResourceId;

/// Console views reachable by navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", content = "id", rename_all = "camelCase")]
pub enum Route {
    Apps,
    Application(ResourceId),
    Deployment(ResourceId),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Apps => "/".to_string(),
            Route::Application(id) => format!("/app/{id}"),
            Route::Deployment(id) => format!("/deployments/{id}"),
        }
    }
}

/// Receives navigation requests raised by actions.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Forwards routes over a channel, e.g. to a headless driver or a test.
impl Navigator for mpsc::UnboundedSender<Route> {
    fn navigate(&self, route: Route) {
        if self.send(route).is_err() {
            log::warn!("navigate: receiver dropped, route discarded");
        }
    }
}
