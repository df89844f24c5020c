//! Idle-time detection: seconds since the last user input.

#[cfg(any(target_os = "windows", target_os = "macos"))]
pub mod listener;
#[cfg(target_os = "linux")]
pub mod wayland;
#[cfg(target_os = "linux")]
pub mod x11;

use async_trait::async_trait;
use thiserror::Error;

use crate::platform::probe::{DisplayServer, Platform};

#[cfg(any(target_os = "windows", target_os = "macos"))]
pub use listener::InputListenerIdleDetector;
#[cfg(target_os = "linux")]
pub use wayland::WaylandIdleDetector;
#[cfg(target_os = "linux")]
pub use x11::X11IdleDetector;

/// Errors from idle detection.
#[derive(Debug, Error)]
pub enum IdleError {
    #[error("idle backend unavailable: {0}")]
    Unavailable(String),
}

/// Reports time since the user last moved a mouse or pressed a key.
///
/// Scoped acquisition: [`IdleDetector::start`] binds OS resources (a
/// listener thread, a DBus connection); [`IdleDetector::stop`] releases
/// them unconditionally. Implementations must make `stop` safe to call
/// even if `start` was never called or already failed.
#[async_trait]
pub trait IdleDetector: Send + Sync {
    /// `true` if querying idle time may suspend the calling task (e.g. a
    /// DBus round-trip); `false` for purely local timestamp reads.
    fn is_async(&self) -> bool;

    /// Starts whatever listeners/monitors this backend needs.
    async fn start(&mut self) -> Result<(), IdleError>;

    /// Returns seconds since the last observed user input.
    async fn idle_seconds(&mut self) -> f64;

    /// Releases all resources acquired by `start`. Must be idempotent.
    async fn stop(&mut self);
}

/// A scope guard that calls [`IdleDetector::start`] on construction and
/// [`IdleDetector::stop`] is left to the caller via `release` — Rust has
/// no native async `Drop`, so callers must call `release` explicitly on
/// every exit path (including error/cancellation paths), mirroring the
/// async-context-manager discipline of the original agent.
pub struct IdleScope<D: IdleDetector> {
    pub detector: D,
}

impl<D: IdleDetector> IdleScope<D> {
    pub async fn enter(mut detector: D) -> Result<Self, IdleError> {
        detector.start().await?;
        Ok(Self { detector })
    }

    pub async fn release(mut self) {
        self.detector.stop().await;
    }
}

/// Builds the idle detector appropriate for the detected platform/display.
#[cfg(any(target_os = "windows", target_os = "macos"))]
pub fn create_idle_detector(_platform: Platform, _display_server: DisplayServer) -> Box<dyn IdleDetector> {
    Box::new(InputListenerIdleDetector::new())
}

/// Builds the idle detector appropriate for the detected platform/display.
#[cfg(target_os = "linux")]
pub fn create_idle_detector(_platform: Platform, display_server: DisplayServer) -> Box<dyn IdleDetector> {
    match display_server {
        DisplayServer::X11 => Box::new(X11IdleDetector::new()),
        _ => Box::new(WaylandIdleDetector::new()),
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_idle_detector_selects_backend_by_platform() {
        let detector = create_idle_detector(Platform::Linux, DisplayServer::X11);
        assert!(!detector.is_async());
        let detector = create_idle_detector(Platform::Linux, DisplayServer::Wayland);
        assert!(detector.is_async());
    }
}
