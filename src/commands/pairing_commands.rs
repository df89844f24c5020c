//! Tauri IPC commands for reading and mutating pairing state.

use tauri::State;

use crate::config::{reset_user_config, save_config, UserConfig};

use super::error::CommandError;
use super::AppState;

#[tauri::command]
pub async fn get_pairing_state(state: State<'_, AppState>) -> Result<UserConfig, CommandError> {
    Ok(state.config.read().await.clone())
}

#[tauri::command]
pub async fn pair_device(
    backend_url: String,
    device_token: String,
    source_name: String,
    source_id: Option<i64>,
    state: State<'_, AppState>,
) -> Result<UserConfig, CommandError> {
    let new_config = UserConfig { backend_url, device_token, source_name, source_id, active: true };
    let saved = save_config(&state.settings_path, &new_config)?;
    *state.config.write().await = saved.clone();
    Ok(saved)
}

#[tauri::command]
pub async fn unpair_device(state: State<'_, AppState>) -> Result<UserConfig, CommandError> {
    let reset = reset_user_config(&state.settings_path)?;
    *state.config.write().await = reset.clone();
    Ok(reset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    #[tokio::test]
    async fn test_pair_then_unpair_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let settings_path = tmp.path().join("settings.ini");
        let config = Arc::new(RwLock::new(UserConfig::default()));

        let saved = save_config(
            &settings_path,
            &UserConfig {
                backend_url: "https://agg.example.com".into(),
                device_token: "tok".into(),
                source_name: "laptop".into(),
                source_id: Some(1),
                active: true,
            },
        )
        .unwrap();
        *config.write().await = saved.clone();
        assert!(config.read().await.is_paired());

        let reset = reset_user_config(&settings_path).unwrap();
        *config.write().await = reset;
        assert!(!config.read().await.is_paired());
    }
}
