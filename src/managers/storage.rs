//! File path resolution and directory management for agent data persistence.
//!
//! Provides platform-specific config directory resolution and ensures
//! required directories exist before use.

use std::fs;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The platform config directory could not be determined.
    #[error("Config directory not found")]
    ConfigDirNotFound,

    /// A file lock could not be acquired because another process holds it.
    #[error("File locked by another process")]
    FileLocked,
}

/// The application directory name used inside the platform config directory.
const APP_DIR_NAME: &str = "clepsy-agent";

/// The subdirectory name for logs.
const LOGS_DIR_NAME: &str = "logs";

/// Returns the platform-specific configuration directory for the agent.
///
/// - Linux: `~/.config/clepsy-agent/`
/// - macOS: `~/Library/Application Support/clepsy-agent/`
/// - Windows: `{FOLDERID_RoamingAppData}/clepsy-agent/`
pub fn get_config_dir() -> Result<PathBuf, StorageError> {
    dirs::config_dir()
        .map(|p| p.join(APP_DIR_NAME))
        .ok_or(StorageError::ConfigDirNotFound)
}

/// Returns the path to `settings.ini`.
pub fn get_settings_path() -> Result<PathBuf, StorageError> {
    Ok(crate::config::default_settings_path(&get_config_dir()?))
}

/// Returns the path to the logs directory.
pub fn get_logs_dir() -> Result<PathBuf, StorageError> {
    Ok(get_config_dir()?.join(LOGS_DIR_NAME))
}

/// Ensures all required directories exist, creating them if necessary.
pub fn ensure_dirs_exist() -> Result<(), StorageError> {
    let config_dir = get_config_dir()?;
    fs::create_dir_all(&config_dir)?;
    fs::create_dir_all(config_dir.join(LOGS_DIR_NAME))?;
    Ok(())
}
