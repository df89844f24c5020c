//! Windows/macOS idle detection via a dedicated global input listener.
//!
//! Mirrors the teacher's `LinuxKeyboardHook`/`MacOSKeyboardHook` rdev-on-a-
//! thread shape, but instead of forwarding key events to a combo matcher it
//! just stamps a monotonic "last activity" clock that both keyboard and
//! mouse events update.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use async_trait::async_trait;

use super::{IdleDetector, IdleError};

/// rdev event callbacks only give us relative instants, so we track a
/// process-wide start `Instant` and store elapsed-millis-since-start in the
/// atomic; `idle_seconds` does the same conversion to compare them.
pub struct InputListenerIdleDetector {
    running: Arc<AtomicBool>,
    started_once: AtomicBool,
    start: Instant,
    last_activity_millis: Arc<AtomicU64>,
}

impl InputListenerIdleDetector {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            started_once: AtomicBool::new(false),
            start: Instant::now(),
            last_activity_millis: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl Default for InputListenerIdleDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdleDetector for InputListenerIdleDetector {
    fn is_async(&self) -> bool {
        false
    }

    async fn start(&mut self) -> Result<(), IdleError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }
        if self.started_once.load(Ordering::SeqCst) {
            return Err(IdleError::Unavailable(
                "input listener cannot be restarted after stop(); create a new instance".into(),
            ));
        }
        self.running.store(true, Ordering::SeqCst);
        self.started_once.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        let last_activity = self.last_activity_millis.clone();
        let start = self.start;
        last_activity.store(start.elapsed().as_millis() as u64, Ordering::SeqCst);

        thread::Builder::new()
            .name("clepsy-idle-listener".into())
            .spawn(move || {
                tracing::info!("input idle listener thread started");
                if let Err(e) = rdev::listen(move |event| {
                    if !running.load(Ordering::SeqCst) {
                        return;
                    }
                    match event.event_type {
                        rdev::EventType::KeyPress(_)
                        | rdev::EventType::KeyRelease(_)
                        | rdev::EventType::MouseMove { .. }
                        | rdev::EventType::ButtonPress(_)
                        | rdev::EventType::ButtonRelease(_)
                        | rdev::EventType::Wheel { .. } => {
                            last_activity.store(start.elapsed().as_millis() as u64, Ordering::SeqCst);
                        }
                    }
                }) {
                    tracing::error!("rdev listen error: {:?}", e);
                }
            })
            .map_err(|e| IdleError::Unavailable(e.to_string()))?;

        Ok(())
    }

    async fn idle_seconds(&mut self) -> f64 {
        let now_millis = self.start.elapsed().as_millis() as u64;
        let last = self.last_activity_millis.load(Ordering::SeqCst);
        let idle_millis = now_millis.saturating_sub(last);
        idle_millis as f64 / 1000.0
    }

    async fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}
