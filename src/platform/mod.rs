//! Platform-specific implementations for window introspection, idle
//! detection and screen capture.
//!
//! Each concern is a small trait (`WindowInfoProvider`, `IdleDetector`,
//! `Screenshotter`) with several backends conditionally compiled per target
//! OS / display server; the concrete backend is picked once at startup by
//! `probe::detect_platform`/`detect_display_server` and held behind a
//! trait object for the life of the process.

pub mod idle;
pub mod probe;
pub mod screenshot;
pub mod window_info;

pub use idle::{create_idle_detector, IdleDetector, IdleError, IdleScope};
pub use probe::{detect_display_server, detect_platform, DisplayServer, Platform, WaylandCompositor};
pub use screenshot::{create_screenshotter, ScreenshotError, ScreenshotScope, Screenshotter};
pub use window_info::{create_window_info_provider, WindowInfoError, WindowInfoProvider};
