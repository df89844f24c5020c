//! Tauri IPC commands exposing delivery/heartbeat health to the tray UI.

use tauri::State;

use crate::models::AppHealth;

use super::error::CommandError;
use super::AppState;

#[tauri::command]
pub async fn get_app_health(state: State<'_, AppState>) -> Result<AppHealth, CommandError> {
    Ok(state.health.read().await.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeliveryStatus;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    #[tokio::test]
    async fn test_health_reflects_recorded_heartbeat() {
        let health = Arc::new(RwLock::new(AppHealth::default()));
        health.write().await.record_heartbeat(DeliveryStatus::Success);
        assert_eq!(health.read().await.last_heartbeat_status, DeliveryStatus::Success);
    }
}
