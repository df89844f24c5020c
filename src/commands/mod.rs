//! Tauri IPC command handlers.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::RwLock;

use crate::config::UserConfig;
use crate::managers::LifecycleManager;
use crate::models::AppHealth;

pub mod error;
pub mod health_commands;
pub mod lifecycle_commands;
pub mod pairing_commands;
pub mod tray_commands;

/// Application state shared across all Tauri commands.
///
/// Holds the same `Arc`s the background capture tasks (scheduler,
/// dispatcher, heartbeat, file watcher) were constructed with, so a
/// pairing command's write is visible to the capture loop on its next
/// poll without an extra notification channel. `lifecycle` is the same
/// `LifecycleManager` that held the single-instance lock at startup,
/// handed to `.manage()` instead of being dropped so commands can read
/// and persist the autostart config through it.
pub struct AppState {
    pub config: Arc<RwLock<UserConfig>>,
    pub health: Arc<RwLock<AppHealth>>,
    pub settings_path: PathBuf,
    pub lifecycle: Mutex<LifecycleManager>,
}
