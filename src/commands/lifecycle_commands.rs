//! Tauri IPC commands for autostart configuration.

use tauri::{AppHandle, State};
use tauri_plugin_autostart::ManagerExt;

use crate::managers::AutostartConfig;

use super::error::CommandError;
use super::AppState;

#[tauri::command]
pub fn get_autostart_config(state: State<'_, AppState>) -> Result<AutostartConfig, CommandError> {
    let mgr = state.lifecycle.lock().map_err(|_| CommandError::lock_poisoned("lifecycle"))?;
    Ok(mgr.get_autostart_config().clone())
}

/// Persists the autostart config and toggles the OS-level autostart
/// registration to match. A failure to toggle the OS registration is
/// logged but does not fail the command — the persisted preference is
/// still the source of truth the next time this runs.
#[tauri::command]
pub fn set_autostart_config(
    enabled: bool,
    minimized: bool,
    app: AppHandle,
    state: State<'_, AppState>,
) -> Result<AutostartConfig, CommandError> {
    let config = AutostartConfig { enabled, minimized };
    {
        let mut mgr = state.lifecycle.lock().map_err(|_| CommandError::lock_poisoned("lifecycle"))?;
        mgr.set_autostart(config.clone())?;
    }

    let autolaunch = app.autolaunch();
    let result = if enabled { autolaunch.enable() } else { autolaunch.disable() };
    if let Err(e) = result {
        tracing::warn!(error = %e, "failed to toggle OS autostart registration");
    }

    Ok(config)
}
