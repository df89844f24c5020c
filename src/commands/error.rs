//! Error types for Tauri IPC command responses.
//!
//! Tauri requires command errors to implement `serde::Serialize`.
//! `CommandError` provides a structured error type with a code and message
//! that the frontend can parse reliably.

use serde::Serialize;

use crate::config::ConfigError;
use crate::managers::{LifecycleError, StorageError};

/// A serializable error type returned by Tauri commands to the frontend.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    /// A machine-readable error code (e.g. "INVALID_URL").
    pub code: String,
    /// A human-readable error message.
    pub message: String,
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<ConfigError> for CommandError {
    fn from(err: ConfigError) -> Self {
        let code = match &err {
            ConfigError::Io(_) => "IO_ERROR",
            ConfigError::Parse(_) => "PARSE_ERROR",
            ConfigError::InvalidUrl(_) => "INVALID_URL",
        };
        CommandError { code: code.to_string(), message: err.to_string() }
    }
}

impl From<StorageError> for CommandError {
    fn from(err: StorageError) -> Self {
        let code = match &err {
            StorageError::Io(_) => "IO_ERROR",
            StorageError::Serialization(_) => "SERIALIZATION_ERROR",
            StorageError::ConfigDirNotFound => "CONFIG_DIR_NOT_FOUND",
            StorageError::FileLocked => "FILE_LOCKED",
        };
        CommandError { code: code.to_string(), message: err.to_string() }
    }
}

impl From<LifecycleError> for CommandError {
    fn from(err: LifecycleError) -> Self {
        let code = match &err {
            LifecycleError::Io(_) => "IO_ERROR",
            LifecycleError::AlreadyRunning => "ALREADY_RUNNING",
            LifecycleError::Serialization(_) => "SERIALIZATION_ERROR",
        };
        CommandError { code: code.to_string(), message: err.to_string() }
    }
}

impl CommandError {
    pub fn lock_poisoned(what: &str) -> Self {
        CommandError { code: "LOCK_ERROR".to_string(), message: format!("failed to acquire {what} lock") }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_serializes() {
        let err = CommandError { code: "TEST".to_string(), message: "test message".to_string() };
        let json = serde_json::to_string(&err).expect("serialize");
        assert!(json.contains("\"code\":\"TEST\""));
        assert!(json.contains("\"message\":\"test message\""));
    }

    #[test]
    fn test_command_error_display() {
        let err = CommandError { code: "TEST".to_string(), message: "msg".to_string() };
        assert_eq!(format!("{err}"), "[TEST] msg");
    }

    #[test]
    fn test_from_config_error_invalid_url() {
        let err: CommandError = ConfigError::InvalidUrl("bad".to_string()).into();
        assert_eq!(err.code, "INVALID_URL");
    }

    #[test]
    fn test_from_storage_error_config_dir_not_found() {
        let err: CommandError = StorageError::ConfigDirNotFound.into();
        assert_eq!(err.code, "CONFIG_DIR_NOT_FOUND");
    }

    #[test]
    fn test_lock_poisoned() {
        let err = CommandError::lock_poisoned("pairing");
        assert_eq!(err.code, "LOCK_ERROR");
        assert!(err.message.contains("pairing"));
    }
}
