pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod heartbeat;
pub mod managers;
pub mod models;
pub mod platform;
pub mod scheduler;
pub mod utils;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::RwLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use commands::health_commands;
use commands::lifecycle_commands;
use commands::pairing_commands;
use commands::tray_commands::TrayMgrState;
use commands::AppState;
use config::{load_user_config, UserConfig};
use managers::{get_logs_dir, get_settings_path, LifecycleManager, TrayManager};
use models::AppHealth;

/// Initializes structured logging to stdout and to a size-rotated file
/// under the agent's logs directory. The returned guard must be held for
/// the life of the process or the non-blocking file writer is torn down
/// and buffered log lines are dropped.
fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match get_logs_dir() {
        Ok(logs_dir) => {
            if let Err(e) = std::fs::create_dir_all(&logs_dir) {
                tracing_subscriber::fmt().with_env_filter(filter).init();
                tracing::warn!(error = %e, "failed to create logs directory, logging to stdout only");
                return None;
            }
            let file_appender = tracing_appender::rolling::daily(&logs_dir, "clepsy-agent.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(non_blocking.and_then(std::io::stdout))
                .init();
            Some(guard)
        }
        Err(e) => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            tracing::warn!(error = %e, "failed to resolve logs directory, logging to stdout only");
            None
        }
    }
}

/// Spawns the capture pipeline (scheduler, dispatcher, heartbeat, settings
/// watcher) on a dedicated OS thread with its own tokio runtime, separate
/// from the Tauri event loop on the main thread.
fn spawn_capture_runtime(config: Arc<RwLock<UserConfig>>, health: Arc<RwLock<AppHealth>>, settings_path: PathBuf) {
    std::thread::Builder::new()
        .name("clepsy-capture-worker".into())
        .spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("failed to build capture runtime");
            runtime.block_on(async move {
                let (events_tx, events_rx) = tokio::sync::mpsc::channel(256);

                let platform = platform::detect_platform();
                let display_server = platform::detect_display_server(platform);
                let provider: Arc<dyn platform::WindowInfoProvider> =
                    Arc::from(platform::create_window_info_provider(platform, display_server));

                let scheduler = scheduler::CaptureScheduler::new(
                    config.clone(),
                    config::Timings::default(),
                    platform,
                    display_server,
                    events_tx,
                );
                let dispatcher = dispatcher::Dispatcher::new(config.clone(), health.clone(), events_rx);
                let heartbeat = heartbeat::HeartbeatPinger::new(config.clone(), health.clone());
                let file_watcher = managers::FileWatcher::new(settings_path, config.clone());

                tokio::join!(
                    scheduler.run(provider),
                    dispatcher.run(),
                    heartbeat.run(),
                    file_watcher.run(),
                );
            });
        })
        .expect("failed to spawn capture worker thread");
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let _tracing_guard = init_tracing();

    let config_dir = managers::get_config_dir().expect("failed to resolve config directory");
    managers::ensure_dirs_exist().expect("failed to create config/logs directories");

    let is_first_run = LifecycleManager::is_first_run(&config_dir);
    if is_first_run {
        tracing::info!("first run detected");
    }

    let lifecycle = match LifecycleManager::try_acquire_lock(&config_dir) {
        Ok(lifecycle) => lifecycle,
        Err(e) => {
            tracing::error!(error = %e, "another instance is already running, exiting");
            return;
        }
    };

    if is_first_run {
        if let Err(e) = LifecycleManager::mark_first_run_complete(&config_dir) {
            tracing::warn!(error = %e, "failed to mark first run complete");
        }
    }

    let settings_path = get_settings_path().expect("failed to resolve settings.ini path");
    let initial_config = load_user_config(&settings_path).unwrap_or_default();

    let config = Arc::new(RwLock::new(initial_config));
    let health = Arc::new(RwLock::new(AppHealth::default()));

    spawn_capture_runtime(config.clone(), health.clone(), settings_path.clone());

    let tray_manager = TrayManager::new();

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_autostart::init(
            tauri_plugin_autostart::MacosLauncher::LaunchAgent,
            None,
        ))
        .manage(AppState { config, health, settings_path, lifecycle: Mutex::new(lifecycle) })
        .manage(TrayMgrState { tray_manager: Mutex::new(tray_manager) })
        .invoke_handler(tauri::generate_handler![
            pairing_commands::get_pairing_state,
            pairing_commands::pair_device,
            pairing_commands::unpair_device,
            health_commands::get_app_health,
            lifecycle_commands::get_autostart_config,
            lifecycle_commands::set_autostart_config,
            commands::tray_commands::get_tray_state,
            commands::tray_commands::set_tray_state,
            commands::tray_commands::get_tray_menu_items,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_app_crate_compiles() {
        assert!(true);
    }
}
