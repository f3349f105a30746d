use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{DeploymentStatus, ResourceId};

/// Application record as served by `GET /app/{id}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ResourceId,
    pub name: String,
    pub namespace: String,
    /// Container image reference, e.g. `nginx:1.27`.
    pub image: String,
    pub replicas: u32,
    pub port: u16,
    #[serde(default, deserialize_with = "env_map")]
    pub environment_variables: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Deployments of this app in the order the server lists them.
    #[serde(default)]
    pub deployments: Vec<DeploymentSummary>,
}

impl Application {
    pub fn image_ref(&self) -> ImageRef {
        ImageRef::parse(&self.image)
    }
}

/// Nested deployment row inside an Application. Extra fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentSummary {
    pub id: ResourceId,
    pub status: DeploymentStatus,
    pub created_at: DateTime<Utc>,
}

/// `GET /app/{id}/status/`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppStatus {
    pub running: bool,
}

impl AppStatus {
    pub fn label(&self) -> &'static str {
        if self.running {
            "Running"
        } else {
            "Not Running"
        }
    }
}

/// Image reference split the way the control plane builds Helm values:
/// everything before the first `:` is the repository, a missing tag is `latest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    pub repository: String,
    pub tag: String,
}

impl ImageRef {
    pub fn parse(image: &str) -> Self {
        let image = image.trim();
        match image.split_once(':') {
            Some((repo, rest)) => {
                let tag = rest.split(':').next().unwrap_or_default();
                ImageRef {
                    repository: repo.to_string(),
                    tag: if tag.is_empty() { "latest" } else { tag }.to_string(),
                }
            }
            None => ImageRef {
                repository: image.to_string(),
                tag: "latest".to_string(),
            },
        }
    }
}

/// Env values are stored as free-form JSON; scalars are shown as text.
fn env_map<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error> {
    let raw: Option<BTreeMap<String, serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| {
            let text = match v {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            (k, text)
        })
        .collect())
}
