//! Fallback screenshotter for Wayland sessions with no unattended capture
//! path (GNOME, KDE — anything lacking `grim` + a wlroots compositor).

use async_trait::async_trait;

use crate::models::{Bbox, CapturedImage};

use super::{ScreenshotError, Screenshotter};

pub struct UnsupportedScreenshotter {
    reason: String,
}

impl UnsupportedScreenshotter {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
impl Screenshotter for UnsupportedScreenshotter {
    async fn start(&mut self) -> Result<(), ScreenshotError> {
        Ok(())
    }

    async fn capture(&mut self, _bbox: Bbox) -> Result<CapturedImage, ScreenshotError> {
        Err(ScreenshotError::Unsupported(self.reason.clone()))
    }

    async fn stop(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_capture_always_errors() {
        let mut shotter = UnsupportedScreenshotter::new("GNOME Wayland");
        let result = shotter.capture(Bbox::new(0, 0, 10, 10)).await;
        assert!(matches!(result, Err(ScreenshotError::Unsupported(_))));
    }
}
