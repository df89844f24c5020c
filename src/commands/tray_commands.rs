//! Tauri IPC commands for system tray operations.

use std::sync::Mutex;

use tauri::State;

use crate::managers::tray_manager::{TrayManager, TrayMenuItem, TrayState};

use super::error::CommandError;

/// Tauri-managed state wrapper for TrayManager.
pub struct TrayMgrState {
    pub tray_manager: Mutex<TrayManager>,
}

#[tauri::command]
pub fn get_tray_state(state: State<'_, TrayMgrState>) -> Result<TrayState, CommandError> {
    let mgr = state.tray_manager.lock().map_err(|_| CommandError::lock_poisoned("tray"))?;
    Ok(mgr.state())
}

#[tauri::command]
pub fn set_tray_state(new_state: TrayState, state: State<'_, TrayMgrState>) -> Result<(), CommandError> {
    let mut mgr = state.tray_manager.lock().map_err(|_| CommandError::lock_poisoned("tray"))?;
    mgr.set_state(new_state);
    Ok(())
}

#[tauri::command]
pub fn get_tray_menu_items(state: State<'_, TrayMgrState>) -> Result<Vec<TrayMenuItem>, CommandError> {
    let mgr = state.tray_manager.lock().map_err(|_| CommandError::lock_poisoned("tray"))?;
    Ok(mgr.build_menu_items())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tray_state_serialization() {
        let state = TrayState::Paired;
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, "\"paired\"");

        let state = TrayState::Unpaired;
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, "\"unpaired\"");
    }

    #[test]
    fn test_tray_mgr_state_struct() {
        let state = TrayMgrState { tray_manager: Mutex::new(TrayManager::new()) };
        let mgr = state.tray_manager.lock().unwrap();
        assert_eq!(mgr.state(), TrayState::Unpaired);
    }
}
