//! MSS-style full-screen capture backend (Win32 GDI / Cocoa / X11) via `scrap`.

use async_trait::async_trait;

use crate::models::{Bbox, CapturedImage};

use super::{ScreenshotError, Screenshotter};

/// Wraps a single `scrap::Capturer` on the primary display, reused across
/// captures the way the reference implementation caches its `mss.mss()`
/// handle instead of reopening it per screenshot.
pub struct MssScreenshotter {
    capturer: Option<scrap::Capturer>,
}

impl MssScreenshotter {
    pub fn new() -> Self {
        Self { capturer: None }
    }

    fn open_capturer() -> Result<scrap::Capturer, ScreenshotError> {
        let display = scrap::Display::primary()
            .map_err(|e| ScreenshotError::CaptureFailed(format!("no primary display: {e}")))?;
        scrap::Capturer::new(display).map_err(|e| ScreenshotError::CaptureFailed(e.to_string()))
    }

    /// Grabs a full frame and crops/converts the requested `bbox` out of it.
    ///
    /// `scrap` frames are BGRA and may be row-padded beyond `width * 4`
    /// bytes (observed on some X11 drivers); the stride is derived from
    /// `frame.len() / height` rather than assumed to equal `width * 4`.
    fn crop_frame(frame: &[u8], frame_width: usize, frame_height: usize, bbox: Bbox) -> Result<CapturedImage, ScreenshotError> {
        if frame_height == 0 {
            return Err(ScreenshotError::CaptureFailed("empty frame".into()));
        }
        let stride = frame.len() / frame_height;
        if bbox.left < 0
            || bbox.top < 0
            || bbox.width <= 0
            || bbox.height <= 0
            || (bbox.right() as usize) > frame_width
            || (bbox.bottom() as usize) > frame_height
        {
            return Err(ScreenshotError::InvalidBounds(format!(
                "bbox {bbox:?} out of frame bounds {frame_width}x{frame_height}"
            )));
        }

        let mut rgb = Vec::with_capacity(bbox.width as usize * bbox.height as usize * 3);
        for row in 0..bbox.height as usize {
            let y = bbox.top as usize + row;
            let row_start = y * stride + bbox.left as usize * 4;
            for col in 0..bbox.width as usize {
                let px = row_start + col * 4;
                let (b, g, r) = (frame[px], frame[px + 1], frame[px + 2]);
                rgb.push(r);
                rgb.push(g);
                rgb.push(b);
            }
        }
        Ok(CapturedImage::new(bbox.width as u32, bbox.height as u32, rgb))
    }
}

impl Default for MssScreenshotter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Screenshotter for MssScreenshotter {
    async fn start(&mut self) -> Result<(), ScreenshotError> {
        if self.capturer.is_none() {
            self.capturer = Some(Self::open_capturer()?);
        }
        Ok(())
    }

    async fn capture(&mut self, bbox: Bbox) -> Result<CapturedImage, ScreenshotError> {
        if self.capturer.is_none() {
            self.capturer = Some(Self::open_capturer()?);
        }
        let capturer = self.capturer.as_mut().expect("just initialized above");
        let (width, height) = (capturer.width(), capturer.height());

        // scrap returns WouldBlock while the compositor prepares a new
        // frame; retry briefly rather than failing the whole capture.
        for _ in 0..30 {
            match capturer.frame() {
                Ok(frame) => return Self::crop_frame(&frame, width, height, bbox),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    continue;
                }
                Err(e) => return Err(ScreenshotError::CaptureFailed(e.to_string())),
            }
        }
        Err(ScreenshotError::CaptureFailed("timed out waiting for a frame".into()))
    }

    async fn stop(&mut self) {
        self.capturer = None;
    }
}
