//! On-disk pairing configuration, backed by an INI file.
//!
//! Mirrors the original Python agent's `configparser`-based settings: a
//! single `[user]` section holding pairing state, loaded leniently and
//! saved while preserving any other sections already on disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SECTION: &str = "user";

/// Errors from configuration load/save/reset.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings file: {0}")]
    Parse(String),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

/// Persisted pairing state. Defaults to all-empty/inactive until a pairing
/// write occurs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    pub backend_url: String,
    pub device_token: String,
    pub source_name: String,
    pub source_id: Option<i64>,
    pub active: bool,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            backend_url: String::new(),
            device_token: String::new(),
            source_name: String::new(),
            source_id: None,
            active: false,
        }
    }
}

impl UserConfig {
    /// `true` when a backend URL, device token, and the active flag are all
    /// present — the gate the scheduler and dispatcher poll on.
    pub fn is_paired(&self) -> bool {
        self.active && !self.backend_url.is_empty() && !self.device_token.is_empty()
    }
}

/// Fixed timing parameters for the capture pipeline. No end-user UI exists
/// for these in this crate's scope; they are compiled-in constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timings {
    pub screenshot_max_side: u32,
    pub global_cd: Duration,
    pub same_window_cd: Duration,
    pub constant_window_cd: Duration,
    pub afk_timeout: Duration,
    pub active_window_poll_interval: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            screenshot_max_side: 1024,
            global_cd: Duration::from_secs(5),
            same_window_cd: Duration::from_secs(15),
            constant_window_cd: Duration::from_secs(30),
            afk_timeout: Duration::from_secs(5 * 60),
            active_window_poll_interval: Duration::from_millis(200),
        }
    }
}

/// Returns `true` if `url` parses with both a scheme and a host.
pub fn is_valid_url(url: &str) -> bool {
    match url.parse::<url::Url>() {
        Ok(parsed) => !parsed.scheme().is_empty() && parsed.host().is_some(),
        Err(_) => false,
    }
}

/// Loads `UserConfig` from an INI file at `path`. Missing file or missing
/// keys yield defaults; an unparsable `sourceId` becomes `None`.
pub fn load_user_config(path: &Path) -> Result<UserConfig, ConfigError> {
    if !path.exists() {
        return Ok(UserConfig::default());
    }
    let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Parse(e.to_string()))?;
    let Some(section) = ini.section(Some(SECTION)) else {
        return Ok(UserConfig::default());
    };
    let source_id = section
        .get("source_id")
        .and_then(|v| v.trim().parse::<i64>().ok());
    Ok(UserConfig {
        backend_url: section.get("backend_url").unwrap_or("").to_string(),
        device_token: section.get("device_token").unwrap_or("").to_string(),
        source_name: section.get("source_name").unwrap_or("").to_string(),
        source_id,
        active: section
            .get("active")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false),
    })
}

/// Rewrites the `[user]` section of `path` with `config`, preserving any
/// other sections already on disk, then reloads and returns the persisted
/// snapshot.
pub fn save_config(path: &Path, config: &UserConfig) -> Result<UserConfig, ConfigError> {
    if !is_valid_url(&config.backend_url) && !config.backend_url.is_empty() {
        return Err(ConfigError::InvalidUrl(config.backend_url.clone()));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut ini = if path.exists() {
        Ini::load_from_file(path).map_err(|e| ConfigError::Parse(e.to_string()))?
    } else {
        Ini::new()
    };
    {
        let section = ini.with_section(Some(SECTION));
        section
            .set("backend_url", &config.backend_url)
            .set("device_token", &config.device_token)
            .set("source_name", &config.source_name)
            .set(
                "source_id",
                config.source_id.map(|v| v.to_string()).unwrap_or_default(),
            )
            .set("active", if config.active { "true" } else { "false" });
    }
    ini.write_to_file(path)?;
    load_user_config(path)
}

/// Removes the `[user]` section (or the whole file, if nothing else is
/// in it) and reloads defaults.
pub fn reset_user_config(path: &Path) -> Result<UserConfig, ConfigError> {
    if !path.exists() {
        return Ok(UserConfig::default());
    }
    let mut ini = Ini::load_from_file(path).map_err(|e| ConfigError::Parse(e.to_string()))?;
    if ini.sections().count() <= 1 {
        std::fs::remove_file(path)?;
        return Ok(UserConfig::default());
    }
    ini.delete(Some(SECTION));
    ini.write_to_file(path)?;
    load_user_config(path)
}

/// Returns the last-modified time of the config file, for the file watcher
/// to poll against.
pub fn config_mtime(path: &Path) -> Option<std::time::SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Default filename for the settings file, matching the teacher's
/// `get_config_dir`-rooted path convention.
pub const SETTINGS_FILENAME: &str = "settings.ini";

pub fn default_settings_path(config_dir: &Path) -> PathBuf {
    config_dir.join(SETTINGS_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_unpaired() {
        let config = UserConfig::default();
        assert!(!config.is_paired());
    }

    #[test]
    fn test_is_valid_url() {
        assert!(is_valid_url("https://example.com"));
        assert!(is_valid_url("http://localhost:8080"));
        assert!(!is_valid_url("not-a-url"));
        assert!(!is_valid_url(""));
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(SETTINGS_FILENAME);
        let config = load_user_config(&path).unwrap();
        assert_eq!(config, UserConfig::default());
    }

    #[test]
    fn test_save_and_reload_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(SETTINGS_FILENAME);
        let config = UserConfig {
            backend_url: "https://agg.example.com".to_string(),
            device_token: "tok-123".to_string(),
            source_name: "work-laptop".to_string(),
            source_id: Some(42),
            active: true,
        };
        let saved = save_config(&path, &config).unwrap();
        assert_eq!(saved, config);

        let reloaded = load_user_config(&path).unwrap();
        assert_eq!(reloaded, config);
        assert!(reloaded.is_paired());
    }

    #[test]
    fn test_save_rejects_invalid_url() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(SETTINGS_FILENAME);
        let config = UserConfig {
            backend_url: "not a url".to_string(),
            ..UserConfig::default()
        };
        assert!(save_config(&path, &config).is_err());
    }

    #[test]
    fn test_save_preserves_other_sections() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(SETTINGS_FILENAME);
        std::fs::write(&path, "[other]\nfoo = bar\n").unwrap();

        let config = UserConfig {
            backend_url: "https://agg.example.com".to_string(),
            device_token: "tok".to_string(),
            source_name: "n".to_string(),
            source_id: None,
            active: true,
        };
        save_config(&path, &config).unwrap();

        let ini = Ini::load_from_file(&path).unwrap();
        assert_eq!(ini.get_from(Some("other"), "foo"), Some("bar"));
        assert_eq!(ini.get_from(Some(SECTION), "backend_url"), Some(config.backend_url.as_str()));
    }

    #[test]
    fn test_reset_removes_file_when_only_user_section() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(SETTINGS_FILENAME);
        save_config(&path, &UserConfig { active: true, ..Default::default() }).unwrap();
        let reset = reset_user_config(&path).unwrap();
        assert_eq!(reset, UserConfig::default());
        assert!(!path.exists());
    }

    #[test]
    fn test_reset_preserves_other_sections() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(SETTINGS_FILENAME);
        std::fs::write(&path, "[other]\nfoo = bar\n[user]\nactive = true\n").unwrap();
        reset_user_config(&path).unwrap();
        assert!(path.exists());
        let ini = Ini::load_from_file(&path).unwrap();
        assert_eq!(ini.get_from(Some("other"), "foo"), Some("bar"));
        assert!(ini.section(Some(SECTION)).is_none());
    }

    #[test]
    fn test_load_tolerates_unparsable_source_id() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(SETTINGS_FILENAME);
        std::fs::write(&path, "[user]\nsource_id = not-a-number\nactive = true\n").unwrap();
        let config = load_user_config(&path).unwrap();
        assert_eq!(config.source_id, None);
        assert!(config.active);
    }
}
