//! Wayland wlroots capture backend: shells out to `grim`.

use std::io::Cursor;
use std::process::Command;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use image::ImageReader;
use serde::Deserialize;

use crate::models::{Bbox, CapturedImage};

use super::{ScreenshotError, Screenshotter};

const GRIM_TIMEOUT: Duration = Duration::from_secs(5);
const LAYOUT_QUERY_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
struct HyprMonitor {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

#[derive(Debug, Deserialize)]
struct SwayOutputRect {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

#[derive(Debug, Deserialize)]
struct SwayOutput {
    rect: SwayOutputRect,
}

/// Captures a region via `grim -g "x,y WxH" -`, PNG on stdout.
pub struct GrimScreenshotter;

impl GrimScreenshotter {
    pub fn new() -> Self {
        Self
    }

    /// Union of all monitor rectangles; used to clamp a requested bbox into
    /// the layout grim can actually see.
    fn layout_bounds() -> Option<Bbox> {
        if crate::platform::probe::binary_on_path("hyprctl") {
            if let Ok(bytes) = run_with_timeout("hyprctl", &["-j", "monitors"], LAYOUT_QUERY_TIMEOUT) {
                if let Ok(monitors) = serde_json::from_slice::<Vec<HyprMonitor>>(&bytes) {
                    if let Some(bounds) = union_rects(monitors.iter().map(|m| (m.x, m.y, m.width, m.height))) {
                        return Some(bounds);
                    }
                }
            }
        }
        if crate::platform::probe::binary_on_path("swaymsg") {
            if let Ok(bytes) = run_with_timeout("swaymsg", &["-t", "get_outputs"], LAYOUT_QUERY_TIMEOUT) {
                if let Ok(outputs) = serde_json::from_slice::<Vec<SwayOutput>>(&bytes) {
                    if let Some(bounds) =
                        union_rects(outputs.iter().map(|o| (o.rect.x, o.rect.y, o.rect.width, o.rect.height)))
                    {
                        return Some(bounds);
                    }
                }
            }
        }
        None
    }
}

fn union_rects(rects: impl Iterator<Item = (i32, i32, i32, i32)>) -> Option<Bbox> {
    let mut min_x = i32::MAX;
    let mut min_y = i32::MAX;
    let mut max_x = i32::MIN;
    let mut max_y = i32::MIN;
    let mut any = false;
    for (x, y, w, h) in rects {
        any = true;
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x + w);
        max_y = max_y.max(y + h);
    }
    if !any {
        return None;
    }
    Some(Bbox::new(min_x, min_y, (max_x - min_x).max(0), (max_y - min_y).max(0)))
}

fn run_with_timeout(bin: &str, args: &[&str], timeout: Duration) -> Result<Vec<u8>, ScreenshotError> {
    let (tx, rx) = mpsc::channel();
    let bin_owned = bin.to_string();
    let args_owned: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    thread::spawn(move || {
        let result = Command::new(&bin_owned).args(&args_owned).output();
        let _ = tx.send(result);
    });
    match rx.recv_timeout(timeout) {
        Ok(Ok(output)) if output.status.success() => Ok(output.stdout),
        Ok(Ok(output)) => Err(ScreenshotError::CaptureFailed(format!(
            "{bin} exited with {:?}: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr)
        ))),
        Ok(Err(e)) => Err(ScreenshotError::CaptureFailed(e.to_string())),
        Err(_) => Err(ScreenshotError::CaptureFailed(format!("{bin} timed out"))),
    }
}

impl Default for GrimScreenshotter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Screenshotter for GrimScreenshotter {
    async fn start(&mut self) -> Result<(), ScreenshotError> {
        Ok(())
    }

    async fn capture(&mut self, bbox: Bbox) -> Result<CapturedImage, ScreenshotError> {
        if bbox.width <= 0 || bbox.height <= 0 {
            return Err(ScreenshotError::InvalidBounds(format!("non-positive bbox size: {bbox:?}")));
        }

        let clamped = match Self::layout_bounds() {
            Some(layout) => bbox.clamp_to(&layout).ok_or_else(|| {
                ScreenshotError::InvalidBounds(format!("bbox {bbox:?} does not overlap layout {layout:?}"))
            })?,
            None => bbox,
        };
        if clamped.width <= 0 || clamped.height <= 0 {
            return Err(ScreenshotError::InvalidBounds(format!("clamped bbox has non-positive size: {clamped:?}")));
        }

        let geometry = format!("{},{} {}x{}", clamped.left, clamped.top, clamped.width, clamped.height);
        let png_bytes = run_with_timeout("grim", &["-g", &geometry, "-"], GRIM_TIMEOUT)?;

        let decoded = ImageReader::new(Cursor::new(png_bytes))
            .with_guessed_format()
            .map_err(|e| ScreenshotError::CaptureFailed(e.to_string()))?
            .decode()
            .map_err(|e| ScreenshotError::CaptureFailed(e.to_string()))?
            .to_rgb8();

        let (width, height) = (decoded.width(), decoded.height());
        Ok(CapturedImage::new(width, height, decoded.into_raw()))
    }

    async fn stop(&mut self) {}
}
