//! Foreground-window metadata providers and the relevance filter.

pub mod hyprland;
pub mod native;
pub mod sway;
pub mod unsupported;

use std::time::Duration;

use thiserror::Error;

use crate::models::{Bbox, WindowInfo};
use crate::platform::probe::{DisplayServer, Platform, WaylandCompositor};

pub use hyprland::HyprlandWindowInfoProvider;
pub use native::NativeWindowInfoProvider;
pub use sway::SwayWindowInfoProvider;
pub use unsupported::UnsupportedWindowInfoProvider;

/// Errors from window-info providers.
#[derive(Debug, Error)]
pub enum WindowInfoError {
    #[error("unsupported compositor: {0}")]
    UnsupportedCompositor(String),

    #[error("transient failure: {0}")]
    Transient(String),
}

/// Reports the foreground window and the known monitor bounding boxes.
pub trait WindowInfoProvider: Send + Sync {
    /// Returns the current foreground window (or `None` if it could not be
    /// determined after retrying) and the bboxes of all known monitors.
    ///
    /// Retries transient failures up to `retries` times, sleeping
    /// `retry_cooldown` between attempts.
    fn active_window(
        &self,
        retries: u32,
        retry_cooldown: Duration,
    ) -> Result<(Option<WindowInfo>, Vec<Bbox>), WindowInfoError>;
}

/// Minimum side length (px) a window must have on its shorter dimension.
const MIN_SIDE_PX: i32 = 200;
/// Acceptable aspect ratio range (width / height).
const ASPECT_MIN: f64 = 0.25;
const ASPECT_MAX: f64 = 4.0;
/// Minimum fraction of monitor area a window must cover to be relevant.
const AREA_RATIO_MIN: f64 = 0.10;

/// Pure function deciding whether a window's geometry is worth capturing.
///
/// A window is relevant iff all of:
/// - `width > 0 && height > 0`
/// - aspect ratio in `[0.25, 4.0]`
/// - `min(width, height) >= 200`
/// - it covers >= 10% of some monitor's area, OR its total intersection
///   with the monitor union is >= 10% of the largest monitor's area.
pub fn active_window_likely_relevant(window: &WindowInfo, monitors: &[Bbox]) -> bool {
    let b = window.bbox;
    if b.width <= 0 || b.height <= 0 {
        return false;
    }
    let aspect = b.width as f64 / b.height as f64;
    if aspect < ASPECT_MIN || aspect > ASPECT_MAX {
        return false;
    }
    if b.width.min(b.height) < MIN_SIDE_PX {
        return false;
    }
    if monitors.is_empty() {
        return false;
    }

    let per_monitor_ok = monitors.iter().any(|m| {
        let area = m.area();
        if area == 0 {
            return false;
        }
        let inter = b.intersection(m).map(|i| i.area()).unwrap_or(0);
        (inter as f64) / (area as f64) >= AREA_RATIO_MIN
    });
    if per_monitor_ok {
        return true;
    }

    let total_intersection: i64 = monitors
        .iter()
        .filter_map(|m| b.intersection(m))
        .map(|i| i.area())
        .sum();
    let largest_area = monitors.iter().map(|m| m.area()).max().unwrap_or(0);
    if largest_area == 0 {
        return false;
    }
    (total_intersection as f64) / (largest_area as f64) >= AREA_RATIO_MIN
}

/// Builds the window-info provider appropriate for the detected platform
/// and display server.
pub fn create_window_info_provider(
    platform: Platform,
    display_server: DisplayServer,
) -> Box<dyn WindowInfoProvider> {
    match (platform, display_server) {
        (_, DisplayServer::Win32) | (_, DisplayServer::Cocoa) | (_, DisplayServer::X11) => {
            Box::new(NativeWindowInfoProvider::new())
        }
        (Platform::Linux, DisplayServer::Wayland) => match crate::platform::probe::detect_wayland_compositor() {
            WaylandCompositor::Hyprland => Box::new(HyprlandWindowInfoProvider::new()),
            WaylandCompositor::Sway => Box::new(SwayWindowInfoProvider::new()),
            WaylandCompositor::Other => Box::new(UnsupportedWindowInfoProvider::new("unsupported Wayland compositor")),
        },
        _ => Box::new(UnsupportedWindowInfoProvider::new("unsupported platform")),
    }
}

/// Fetches the active window and applies the relevance filter in one step.
pub fn get_active_window_if_relevant(
    provider: &dyn WindowInfoProvider,
    retries: u32,
    retry_cooldown: Duration,
) -> Result<Option<WindowInfo>, WindowInfoError> {
    let (window, monitors) = provider.active_window(retries, retry_cooldown)?;
    Ok(window.filter(|w| active_window_likely_relevant(w, &monitors)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(width: i32, height: i32) -> WindowInfo {
        WindowInfo {
            title: "t".into(),
            app_name: "a".into(),
            bbox: Bbox::new(0, 0, width, height),
            monitor_names: vec![],
        }
    }

    #[test]
    fn test_relevant_window_on_single_monitor() {
        let monitors = vec![Bbox::new(0, 0, 1920, 1080)];
        assert!(active_window_likely_relevant(&window(800, 600), &monitors));
    }

    #[test]
    fn test_rejects_zero_size() {
        let monitors = vec![Bbox::new(0, 0, 1920, 1080)];
        assert!(!active_window_likely_relevant(&window(0, 600), &monitors));
    }

    #[test]
    fn test_rejects_below_min_side() {
        let monitors = vec![Bbox::new(0, 0, 1920, 1080)];
        assert!(!active_window_likely_relevant(&window(199, 1000), &monitors));
    }

    #[test]
    fn test_accepts_at_exact_min_side_and_aspect() {
        let monitors = vec![Bbox::new(0, 0, 1920, 1080)];
        assert!(active_window_likely_relevant(&window(200, 200), &monitors));
    }

    #[test]
    fn test_rejects_aspect_outside_range() {
        let monitors = vec![Bbox::new(0, 0, 1920, 1080)];
        // aspect 5.0 > ASPECT_MAX
        assert!(!active_window_likely_relevant(&window(1000, 200), &monitors));
    }

    #[test]
    fn test_accepts_at_exact_aspect_boundaries() {
        let monitors = vec![Bbox::new(0, 0, 4000, 4000)];
        assert!(active_window_likely_relevant(&window(800, 3200), &monitors)); // ratio 0.25
        assert!(active_window_likely_relevant(&window(3200, 800), &monitors)); // ratio 4.0
    }

    #[test]
    fn test_window_entirely_outside_monitors_is_rejected() {
        let monitors = vec![Bbox::new(0, 0, 1920, 1080)];
        let mut w = window(800, 600);
        w.bbox = Bbox::new(5000, 5000, 800, 600);
        assert!(!active_window_likely_relevant(&w, &monitors));
    }

    #[test]
    fn test_exact_ten_percent_coverage_is_accepted() {
        // Monitor area = 1000*1000 = 1_000_000. 10% = 100_000.
        // A 500x200 window (area 100_000, aspect 2.5, min side 200) qualifies.
        let monitors = vec![Bbox::new(0, 0, 1000, 1000)];
        let w = window(500, 200);
        assert!(active_window_likely_relevant(&w, &monitors));
    }

    #[test]
    fn test_pure_same_inputs_same_verdict() {
        let monitors = vec![Bbox::new(0, 0, 1920, 1080)];
        let w = window(800, 600);
        assert_eq!(
            active_window_likely_relevant(&w, &monitors),
            active_window_likely_relevant(&w, &monitors)
        );
    }
}
