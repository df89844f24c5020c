//! Polls the settings file for external modifications (made by the pairing
//! UI, or a user hand-editing the INI file) and reloads it into a shared
//! `UserConfig`. A cheap mtime poll rather than an OS file-watch, since the
//! only writer is this same application's own pairing flow.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::RwLock;

use crate::config::{config_mtime, load_user_config, UserConfig};

/// How often the settings file's mtime is checked for changes.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Watches a single settings file and keeps a shared `UserConfig` in sync
/// with whatever is on disk.
pub struct FileWatcher {
    path: PathBuf,
    config: Arc<RwLock<UserConfig>>,
    last_mtime: Option<SystemTime>,
}

impl FileWatcher {
    pub fn new(path: PathBuf, config: Arc<RwLock<UserConfig>>) -> Self {
        Self { path, config, last_mtime: None }
    }

    /// Loads once synchronously and primes the mtime baseline so the first
    /// poll iteration doesn't immediately treat the file as "changed".
    pub async fn prime(&mut self) {
        self.last_mtime = config_mtime(&self.path);
        if let Ok(loaded) = load_user_config(&self.path) {
            *self.config.write().await = loaded;
        }
    }

    /// Runs forever, reloading `self.config` whenever the settings file's
    /// mtime advances.
    pub async fn run(mut self) {
        self.prime().await;
        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            let current_mtime = config_mtime(&self.path);
            if current_mtime == self.last_mtime {
                continue;
            }
            self.last_mtime = current_mtime;
            match load_user_config(&self.path) {
                Ok(loaded) => {
                    tracing::info!(path = %self.path.display(), "settings file changed, reloaded");
                    *self.config.write().await = loaded;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to reload settings file after change");
                }
            }
        }
    }
}
