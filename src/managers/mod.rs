//! Long-lived application-lifecycle managers: single-instance locking,
//! settings-file watching, path resolution, and tray state.
//!
//! The capture pipeline itself (scheduling, dispatch, heartbeats) lives at
//! the crate root rather than here, since none of it is a "manager" in the
//! stateful-singleton sense these are.

pub mod file_watcher;
pub mod lifecycle_manager;
pub mod storage;
pub mod tray_manager;

pub use file_watcher::FileWatcher;
pub use lifecycle_manager::{AutostartConfig, LifecycleError, LifecycleManager};
pub use storage::{ensure_dirs_exist, get_config_dir, get_logs_dir, get_settings_path, StorageError};
pub use tray_manager::{TrayManager, TrayMenuItem, TrayState};
