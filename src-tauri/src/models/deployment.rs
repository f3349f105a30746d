use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ResourceId;

/// Deployment record as served by `GET /app/deployments/{id}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: ResourceId,
    pub app: AppRef,
    #[serde(default)]
    pub app_name: Option<String>,
    pub status: DeploymentStatus,
    /// Helm values applied for this rollout, normally YAML text.
    #[serde(default)]
    pub helm_values: serde_json::Value,
    #[serde(default)]
    pub logs: Option<String>,
    #[serde(default)]
    pub error_messages: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Deployment {
    pub fn app_id(&self) -> &ResourceId {
        match &self.app {
            AppRef::Id(id) => id,
            AppRef::Nested { id, .. } => id,
        }
    }

    /// Display name of the owning app, whichever shape the server sent.
    pub fn app_display_name(&self) -> Option<&str> {
        match &self.app {
            AppRef::Nested { name: Some(name), .. } => Some(name),
            _ => self.app_name.as_deref(),
        }
    }
}

/// The owning application, either as a bare id or a nested object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AppRef {
    Id(ResourceId),
    Nested {
        id: ResourceId,
        #[serde(default)]
        name: Option<String>,
    },
}

/// Server-defined status string. Unknown values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentStatus(String);

impl DeploymentStatus {
    pub const PENDING: &'static str = "pending";
    pub const IN_PROGRESS: &'static str = "in-progress";
    pub const RUNNING: &'static str = "running";
    pub const SUCCEEDED: &'static str = "succeeded";
    pub const SUCCESS: &'static str = "success";
    pub const FAILED: &'static str = "failed";

    pub fn new(raw: impl Into<String>) -> Self {
        DeploymentStatus(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_failed(&self) -> bool {
        self.0.eq_ignore_ascii_case(Self::FAILED)
    }

    pub fn is_succeeded(&self) -> bool {
        self.0.eq_ignore_ascii_case(Self::SUCCEEDED) || self.0.eq_ignore_ascii_case(Self::SUCCESS)
    }

    /// Whether the rollout has settled. Display only; polling ignores it.
    pub fn is_terminal(&self) -> bool {
        self.is_succeeded() || self.is_failed()
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
