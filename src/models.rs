//! Core data types shared across the capture pipeline and the Tauri IPC layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An integer rectangle in global virtual-desktop coordinates.
///
/// Monitors may have negative origins (a monitor positioned left of or above
/// the primary one), so `left`/`top` are signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bbox {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl Bbox {
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self { left, top, width, height }
    }

    pub fn area(&self) -> i64 {
        (self.width.max(0) as i64) * (self.height.max(0) as i64)
    }

    pub fn right(&self) -> i32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.top + self.height
    }

    /// Returns the intersection of `self` and `other`, or `None` if they do
    /// not overlap.
    pub fn intersection(&self, other: &Bbox) -> Option<Bbox> {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return None;
        }
        Some(Bbox::new(left, top, right - left, bottom - top))
    }

    /// Clamps `self` to lie within `bounds`, returning `None` if the result
    /// is empty.
    pub fn clamp_to(&self, bounds: &Bbox) -> Option<Bbox> {
        self.intersection(bounds)
    }
}

/// Information about the foreground window.
///
/// Serialized snake_case, matching the backend's expected
/// `active_window` shape — this is a wire type, not a UI-facing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    /// Window title; may be empty.
    pub title: String,
    /// Stable application identifier (executable basename, bundle id, or
    /// Wayland app-id/class).
    pub app_name: String,
    pub bbox: Bbox,
    /// Names of the monitors this window touches, if known.
    pub monitor_names: Vec<String>,
}

impl WindowInfo {
    /// Fingerprint used by the scheduler to detect a window change:
    /// `"{app_name}\0{title}"`.
    pub fn hash(&self) -> String {
        format!("{}\0{}", self.app_name, self.title)
    }
}

/// A decoded RGB image captured from the desktop.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub width: u32,
    pub height: u32,
    /// Tightly packed 8-bit RGB pixels, row-major, no padding.
    pub rgb: Vec<u8>,
}

impl CapturedImage {
    pub fn new(width: u32, height: u32, rgb: Vec<u8>) -> Self {
        debug_assert_eq!(rgb.len(), (width as usize) * (height as usize) * 3);
        Self { width, height, rgb }
    }
}

/// A captured screenshot event, ready for delivery.
#[derive(Debug, Clone)]
pub struct DesktopCheck {
    pub id: Uuid,
    pub screenshot: CapturedImage,
    pub active_window: WindowInfo,
    pub timestamp: DateTime<Utc>,
    pub time_since_last_user_activity: f64,
    pub bbox: Bbox,
}

/// An away-from-keyboard transition event. Serialized snake_case for the
/// backend's `afk-input` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AfkStart {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub time_since_last_user_activity: f64,
}

/// Serializable metadata posted alongside a `DesktopCheck`'s screenshot,
/// as the multipart `data` field's snake_case JSON body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesktopCheckMetadata {
    pub active_window: WindowInfo,
    pub timestamp: DateTime<Utc>,
    pub time_since_last_user_activity: f64,
}

impl From<&DesktopCheck> for DesktopCheckMetadata {
    fn from(event: &DesktopCheck) -> Self {
        Self {
            active_window: event.active_window.clone(),
            timestamp: event.timestamp,
            time_since_last_user_activity: event.time_since_last_user_activity,
        }
    }
}

/// An event produced by the scheduler and consumed by the dispatcher.
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    DesktopCheck(DesktopCheck),
    AfkStart(AfkStart),
}

/// Whether the last attempt at an operation succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryStatus {
    Success,
    Fail,
    None,
}

impl Default for DeliveryStatus {
    fn default() -> Self {
        Self::None
    }
}

/// Liveness/delivery health snapshot exposed to the tray UI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppHealth {
    pub last_heartbeat_timestamp: Option<DateTime<Utc>>,
    pub last_heartbeat_status: DeliveryStatus,
    pub last_data_sent_timestamp: Option<DateTime<Utc>>,
    pub last_data_sent_status: DeliveryStatus,
}

impl AppHealth {
    pub fn record_heartbeat(&mut self, status: DeliveryStatus) {
        self.last_heartbeat_timestamp = Some(Utc::now());
        self.last_heartbeat_status = status;
    }

    pub fn record_data_sent(&mut self, status: DeliveryStatus) {
        self.last_data_sent_timestamp = Some(Utc::now());
        self.last_data_sent_status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_area() {
        let b = Bbox::new(0, 0, 100, 50);
        assert_eq!(b.area(), 5000);
    }

    #[test]
    fn test_bbox_intersection_overlap() {
        let a = Bbox::new(0, 0, 100, 100);
        let b = Bbox::new(50, 50, 100, 100);
        let i = a.intersection(&b).unwrap();
        assert_eq!(i, Bbox::new(50, 50, 50, 50));
    }

    #[test]
    fn test_bbox_intersection_none() {
        let a = Bbox::new(0, 0, 10, 10);
        let b = Bbox::new(100, 100, 10, 10);
        assert!(a.intersection(&b).is_none());
    }

    #[test]
    fn test_bbox_clamp_wlroots_scenario() {
        // From the wlroots clamp end-to-end scenario: window (-50,0,1200x800)
        // clamped to layout union (0,0,1920x1080).
        let window = Bbox::new(-50, 0, 1200, 800);
        let layout = Bbox::new(0, 0, 1920, 1080);
        let clamped = window.clamp_to(&layout).unwrap();
        assert_eq!(clamped, Bbox::new(0, 0, 1150, 800));
    }

    #[test]
    fn test_window_info_hash_distinguishes_title_and_app() {
        let a = WindowInfo {
            title: "Inbox".into(),
            app_name: "Mail".into(),
            bbox: Bbox::new(0, 0, 800, 600),
            monitor_names: vec![],
        };
        let b = WindowInfo { title: "Sent".into(), ..a.clone() };
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_app_health_default_is_none() {
        let health = AppHealth::default();
        assert_eq!(health.last_heartbeat_status, DeliveryStatus::None);
        assert!(health.last_heartbeat_timestamp.is_none());
    }

    #[test]
    fn test_app_health_record_data_sent() {
        let mut health = AppHealth::default();
        health.record_data_sent(DeliveryStatus::Success);
        assert_eq!(health.last_data_sent_status, DeliveryStatus::Success);
        assert!(health.last_data_sent_timestamp.is_some());
    }

    #[test]
    fn test_desktop_check_metadata_serializes_snake_case() {
        let event = DesktopCheck {
            id: Uuid::new_v4(),
            screenshot: CapturedImage::new(1, 1, vec![0, 0, 0]),
            active_window: WindowInfo {
                title: "t".into(),
                app_name: "a".into(),
                bbox: Bbox::new(0, 0, 1, 1),
                monitor_names: vec![],
            },
            timestamp: Utc::now(),
            time_since_last_user_activity: 1.5,
            bbox: Bbox::new(0, 0, 1, 1),
        };
        let meta = DesktopCheckMetadata::from(&event);
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"active_window\""));
        assert!(json.contains("\"app_name\""));
        assert!(json.contains("\"monitor_names\""));
        assert!(json.contains("\"time_since_last_user_activity\":1.5"));
    }

    #[test]
    fn test_afk_start_serializes_snake_case() {
        let afk =
            AfkStart { id: Uuid::new_v4(), timestamp: Utc::now(), time_since_last_user_activity: 42.0 };
        let json = serde_json::to_string(&afk).unwrap();
        assert!(json.contains("\"time_since_last_user_activity\":42.0"));
    }
}
