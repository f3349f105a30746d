pub mod actions;
pub mod client;
#[cfg(feature = "desktop")]
pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod render;
pub mod sync;

#[cfg(test)]
mod testing;

pub use error::{ActionError, FetchError, FetchErrorKind};

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use tauri::Manager;

    tauri::Builder::default()
        .setup(|app| {
            if cfg!(debug_assertions) {
                app.handle().plugin(
                    tauri_plugin_log::Builder::default()
                        .level(log::LevelFilter::Info)
                        .build(),
                )?;
            }

            config::init(config::ConsoleConfig::load()?)?;
            let state = commands::ConsoleState::new(app.handle().clone())?;
            app.manage(state);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::resources::subscribe_resource,
            commands::resources::unsubscribe_resource,
            commands::resources::revalidate_resource,
            commands::resources::deployment_view,
            commands::deploy::trigger_deploy,
            commands::deploy::deploy_state,
            commands::deploy::reset_deploy,
            commands::values::render_helm_values,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
