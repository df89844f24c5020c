use std::path::PathBuf;

use clepsy_agent_lib::config::UserConfig;
use clepsy_agent_lib::models::{Bbox, WindowInfo};
use tempfile::TempDir;

/// Creates a temporary directory for testing.
/// The directory is automatically cleaned up when the returned TempDir is dropped.
pub fn create_temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// Creates a temporary directory and returns its path as a PathBuf.
pub fn create_temp_dir_path() -> (TempDir, PathBuf) {
    let temp_dir = create_temp_dir();
    let path = temp_dir.path().to_path_buf();
    (temp_dir, path)
}

/// Test fixture: a paired `UserConfig` with otherwise-default timings.
pub fn paired_config() -> UserConfig {
    UserConfig {
        backend_url: "https://agg.example.com".to_string(),
        device_token: "test-token".to_string(),
        source_name: "test-laptop".to_string(),
        source_id: Some(1),
        active: true,
    }
}

/// Test fixture: a window of the given geometry, relevant on a 1920x1080 monitor.
pub fn window_with_bbox(bbox: Bbox) -> WindowInfo {
    WindowInfo { title: "Test Window".into(), app_name: "test-app".into(), bbox, monitor_names: vec![] }
}

/// Helper to assert that a Result is Ok and return the value.
pub fn assert_ok<T, E: std::fmt::Debug>(result: Result<T, E>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("Expected Ok, got Err: {:?}", err),
    }
}

/// Helper to assert that a Result is Err.
pub fn assert_err<T: std::fmt::Debug, E>(result: Result<T, E>) {
    match result {
        Ok(value) => panic!("Expected Err, got Ok: {:?}", value),
        Err(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_temp_dir() {
        let temp_dir = create_temp_dir();
        assert!(temp_dir.path().exists());
    }

    #[test]
    fn test_paired_config_is_paired() {
        assert!(paired_config().is_paired());
    }

    #[test]
    fn test_assert_ok() {
        let result: Result<i32, &str> = Ok(42);
        assert_eq!(assert_ok(result), 42);
    }

    #[test]
    #[should_panic(expected = "Expected Ok, got Err")]
    fn test_assert_ok_panics_on_err() {
        let result: Result<i32, &str> = Err("error");
        assert_ok(result);
    }

    #[test]
    fn test_assert_err() {
        let result: Result<i32, &str> = Err("error");
        assert_err(result);
    }
}
