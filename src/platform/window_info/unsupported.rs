//! Fallback provider for display servers with no supported backend.

use std::time::Duration;

use crate::models::{Bbox, WindowInfo};

use super::{WindowInfoError, WindowInfoProvider};

/// Always reports an unsupported-compositor error. Used for Wayland
/// sessions under GNOME, KDE, or any compositor without a `grim`-capable
/// wlroots protocol.
pub struct UnsupportedWindowInfoProvider {
    reason: String,
}

impl UnsupportedWindowInfoProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl WindowInfoProvider for UnsupportedWindowInfoProvider {
    fn active_window(
        &self,
        _retries: u32,
        _retry_cooldown: Duration,
    ) -> Result<(Option<WindowInfo>, Vec<Bbox>), WindowInfoError> {
        Err(WindowInfoError::UnsupportedCompositor(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_reports_unsupported() {
        let provider = UnsupportedWindowInfoProvider::new("GNOME Wayland");
        let result = provider.active_window(0, Duration::from_millis(0));
        assert!(matches!(result, Err(WindowInfoError::UnsupportedCompositor(_))));
    }
}
