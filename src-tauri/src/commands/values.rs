use crate::render::{self, ValuesView};

/// Normalizes a Helm values payload for display. Never fails: malformed
/// YAML comes back as `raw` with the parse error.
#[tauri::command]
pub fn render_helm_values(payload: serde_json::Value) -> ValuesView {
    render::render_helm_values(&payload)
}
