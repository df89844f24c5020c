//! Linux/X11 idle detection via the XScreenSaver extension.

use async_trait::async_trait;
use x11rb::connection::Connection;
use x11rb::protocol::screensaver::ConnectionExt as _;
use x11rb::rust_connection::RustConnection;

use super::{IdleDetector, IdleError};

pub struct X11IdleDetector {
    conn: Option<RustConnection>,
    root: u32,
}

impl X11IdleDetector {
    pub fn new() -> Self {
        Self { conn: None, root: 0 }
    }

    fn query_idle_millis(conn: &RustConnection, root: u32) -> Result<u64, IdleError> {
        let info = conn
            .screensaver_query_info(root)
            .map_err(|e| IdleError::Unavailable(e.to_string()))?
            .reply()
            .map_err(|e| IdleError::Unavailable(e.to_string()))?;
        Ok(info.ms_since_user_input as u64)
    }
}

impl Default for X11IdleDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdleDetector for X11IdleDetector {
    fn is_async(&self) -> bool {
        false
    }

    async fn start(&mut self) -> Result<(), IdleError> {
        let (conn, screen_num) =
            RustConnection::connect(None).map_err(|e| IdleError::Unavailable(e.to_string()))?;
        let root = conn.setup().roots[screen_num].root;
        self.conn = Some(conn);
        self.root = root;
        Ok(())
    }

    async fn idle_seconds(&mut self) -> f64 {
        let Some(conn) = self.conn.take() else {
            return 0.0;
        };
        let root = self.root;
        // Offload the blocking round-trip to a worker thread so the async
        // scheduler loop isn't stalled on X server latency.
        let result = tokio::task::spawn_blocking(move || {
            let millis = Self::query_idle_millis(&conn, root);
            (conn, millis)
        })
        .await;
        match result {
            Ok((conn, Ok(millis))) => {
                self.conn = Some(conn);
                millis as f64 / 1000.0
            }
            Ok((conn, Err(e))) => {
                tracing::warn!(error = %e, "XScreenSaverQueryInfo failed");
                self.conn = Some(conn);
                0.0
            }
            Err(e) => {
                tracing::warn!(error = %e, "idle query task panicked");
                0.0
            }
        }
    }

    async fn stop(&mut self) {
        self.conn = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_async_false() {
        let detector = X11IdleDetector::new();
        assert!(!detector.is_async());
    }

    #[tokio::test]
    async fn test_idle_seconds_without_start_is_zero() {
        let mut detector = X11IdleDetector::new();
        assert_eq!(detector.idle_seconds().await, 0.0);
    }
}
