//! Display projections of cached records. No markup, only the text and
//! placeholders a view shows.

pub mod values;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::Deployment;
use crate::sync::{CacheEntry, EntryStatus};

pub use values::{render_helm_values, render_values_text, ValuesView};

pub const NO_LOGS: &str = "No logs available.";
pub const NO_ERRORS: &str = "No error messages.";

/// Free text, or a placeholder when absent or blank.
pub fn text_or_placeholder<'a>(text: Option<&'a str>, placeholder: &'a str) -> &'a str {
    match text {
        Some(t) if !t.trim().is_empty() => t,
        _ => placeholder,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentView {
    pub title: String,
    pub status: String,
    pub settled: bool,
    pub values: ValuesView,
    pub logs: String,
    pub errors: String,
    pub created_at: DateTime<Utc>,
}

impl DeploymentView {
    pub fn from_deployment(dep: &Deployment) -> Self {
        let app = dep
            .app_display_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("app {}", dep.app_id()));

        Self {
            title: format!("Deployment of {app}"),
            status: dep.status.to_string(),
            settled: dep.status.is_terminal(),
            values: render_helm_values(&dep.helm_values),
            logs: text_or_placeholder(dep.logs.as_deref(), NO_LOGS).to_string(),
            errors: text_or_placeholder(dep.error_messages.as_deref(), NO_ERRORS).to_string(),
            created_at: dep.created_at,
        }
    }
}

/// Label for the running-status indicator next to an app name.
pub fn status_badge(entry: &CacheEntry) -> &'static str {
    match (entry.status, entry.data.as_ref().and_then(|d| d.as_status())) {
        (EntryStatus::Error, _) => "Error",
        (_, Some(status)) => status.label(),
        _ => "Loading...",
    }
}
