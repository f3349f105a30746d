use std::time::Duration;

use serde::Serialize;
use tauri::{AppHandle, Emitter, Manager, State};

use super::ConsoleState;
use crate::models::ResourceKey;
use crate::render::DeploymentView;
use crate::sync::{CacheEntry, SubscribeConfig};

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct EntryEvent {
    subscription: u64,
    key: ResourceKey,
    entry: CacheEntry,
}

// ── subscribe_resource ────────────────────────────────────────────────────────

/// Starts keeping `key` fresh for a mounted view and returns the subscription id.
///
/// `interval_ms` overrides the default schedule: deployments poll at the
/// configured interval, everything else is fetched once per mount.
///
/// Events emitted:
/// - `cache-entry` with payload `{ subscription, key, entry }` on every change,
///   starting with the current entry
#[tauri::command]
pub async fn subscribe_resource(
    app: AppHandle,
    key: ResourceKey,
    interval_ms: Option<u64>,
    state: State<'_, ConsoleState>,
) -> Result<u64, String> {
    let config = match interval_ms {
        Some(ms) => SubscribeConfig {
            key: key.clone(),
            interval: Some(Duration::from_millis(ms)),
        },
        None => SubscribeConfig::for_view(key.clone(), state.config.deployment_poll_interval),
    };

    let mut subscription = state.sync.subscribe(config);
    let id = subscription.id();

    let first = EntryEvent {
        subscription: id,
        key: key.clone(),
        entry: subscription.observe(),
    };
    app.emit("cache-entry", first).map_err(|e| e.to_string())?;

    let task = tokio::spawn(async move {
        while let Some(entry) = subscription.changed().await {
            let event = EntryEvent {
                subscription: id,
                key: key.clone(),
                entry,
            };
            if let Err(e) = app.emit("cache-entry", event) {
                log::warn!("sync: emit for subscription #{id} failed: {e}");
                break;
            }
        }
        if let Some(state) = app.try_state::<ConsoleState>() {
            state.forwarders.forget(id);
        }
    });

    state.forwarders.track(id, task);
    Ok(id)
}

/// Stops the subscription. Called on view unmount.
#[tauri::command]
pub async fn unsubscribe_resource(
    subscription: u64,
    state: State<'_, ConsoleState>,
) -> Result<bool, String> {
    Ok(state.forwarders.cancel(subscription))
}

/// Revalidates `key` now (joining any in-flight fetch) and returns the entry.
#[tauri::command]
pub async fn revalidate_resource(
    key: ResourceKey,
    state: State<'_, ConsoleState>,
) -> Result<Option<CacheEntry>, String> {
    state.sync.revalidate(&key).await;
    Ok(state.sync.entry(&key))
}

/// Display projection of a cached deployment, if it has been fetched.
#[tauri::command]
pub async fn deployment_view(
    key: ResourceKey,
    state: State<'_, ConsoleState>,
) -> Result<Option<DeploymentView>, String> {
    let entry = state.sync.entry(&key);
    Ok(entry
        .as_ref()
        .and_then(|e| e.data.as_ref())
        .and_then(|data| data.as_deployment())
        .map(DeploymentView::from_deployment))
}
