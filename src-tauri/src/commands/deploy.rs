use tauri::State;

use super::ConsoleState;
use crate::actions::{ActionPhase, DeployOutcome};
use crate::models::ResourceId;

/// Deploys the app. The webview disables its button while `deploy_state`
/// reports `inFlight`; a concurrent call is rejected without a request.
/// On success a `navigate` event to the new deployment is emitted first.
#[tauri::command]
pub async fn trigger_deploy(
    app_id: ResourceId,
    state: State<'_, ConsoleState>,
) -> Result<DeployOutcome, String> {
    state.deploy.trigger(&app_id).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn deploy_state(
    app_id: ResourceId,
    state: State<'_, ConsoleState>,
) -> Result<ActionPhase, String> {
    Ok(state.deploy.state(&app_id))
}

/// Clears a settled deploy state. Called when the app view unmounts.
#[tauri::command]
pub async fn reset_deploy(app_id: ResourceId, state: State<'_, ConsoleState>) -> Result<bool, String> {
    Ok(state.deploy.reset(&app_id))
}
