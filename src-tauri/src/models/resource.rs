use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use super::{AppStatus, Application, Deployment};

/// Server-assigned identifier. The control plane emits integers today, but the
/// console treats ids as opaque and accepts strings too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(n) => Ok(ResourceId(n.to_string())),
            Raw::Text(s) if !s.trim().is_empty() => Ok(ResourceId(s)),
            Raw::Text(_) => Err(serde::de::Error::custom("empty resource id")),
        }
    }
}

impl From<u64> for ResourceId {
    fn from(n: u64) -> Self {
        ResourceId(n.to_string())
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        ResourceId(s.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(s: String) -> Self {
        ResourceId(s)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies exactly one remote record. Each key maps to one URL path on the
/// control plane and is the unit of caching, polling and coalescing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum ResourceKey {
    Application(ResourceId),
    ApplicationStatus(ResourceId),
    Deployment(ResourceId),
}

impl ResourceKey {
    pub fn application(id: impl Into<ResourceId>) -> Self {
        ResourceKey::Application(id.into())
    }

    pub fn application_status(id: impl Into<ResourceId>) -> Self {
        ResourceKey::ApplicationStatus(id.into())
    }

    pub fn deployment(id: impl Into<ResourceId>) -> Self {
        ResourceKey::Deployment(id.into())
    }

    /// Path relative to the API base, with the control plane's trailing slash.
    pub fn path(&self) -> String {
        match self {
            ResourceKey::Application(id) => format!("/app/{id}/"),
            ResourceKey::ApplicationStatus(id) => format!("/app/{id}/status/"),
            ResourceKey::Deployment(id) => format!("/app/deployments/{id}/"),
        }
    }

    pub fn id(&self) -> &ResourceId {
        match self {
            ResourceKey::Application(id)
            | ResourceKey::ApplicationStatus(id)
            | ResourceKey::Deployment(id) => id,
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// A decoded record, tagged by the kind of key it was fetched for.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase")]
pub enum Resource {
    Application(Application),
    ApplicationStatus(AppStatus),
    Deployment(Deployment),
}

impl Resource {
    /// Decodes a JSON object into the record type that `key` names.
    pub fn decode(key: &ResourceKey, value: serde_json::Value) -> Result<Self, serde_json::Error> {
        Ok(match key {
            ResourceKey::Application(_) => Resource::Application(serde_json::from_value(value)?),
            ResourceKey::ApplicationStatus(_) => {
                Resource::ApplicationStatus(serde_json::from_value(value)?)
            }
            ResourceKey::Deployment(_) => Resource::Deployment(serde_json::from_value(value)?),
        })
    }

    pub fn as_application(&self) -> Option<&Application> {
        match self {
            Resource::Application(app) => Some(app),
            _ => None,
        }
    }

    pub fn as_status(&self) -> Option<&AppStatus> {
        match self {
            Resource::ApplicationStatus(status) => Some(status),
            _ => None,
        }
    }

    pub fn as_deployment(&self) -> Option<&Deployment> {
        match self {
            Resource::Deployment(dep) => Some(dep),
            _ => None,
        }
    }
}
