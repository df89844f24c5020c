//! Capture scheduling: decides when to take a screenshot based on
//! foreground-window focus changes, idle state, and cooldowns.
//!
//! One task, spawned once per process and running until the app exits.
//! While unpaired (or paused) it polls the pairing gate every few seconds
//! and does nothing else; once paired it finds the first relevant window,
//! opens an idle detector and a screenshotter for the session, and then
//! runs the cooldown state machine until pairing is lost, at which point
//! both are released and the outer loop starts over.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::config::{Timings, UserConfig};
use crate::models::{AfkStart, CaptureEvent, CapturedImage, DesktopCheck};
use crate::platform::window_info::get_active_window_if_relevant;
use crate::platform::{DisplayServer, IdleScope, Platform, ScreenshotScope, WindowInfoProvider};

/// How often the pairing gate is re-checked while unpaired.
const PAIRING_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Retries for a single "get the active window" attempt.
const WINDOW_QUERY_RETRIES: u32 = 3;
/// Maximum entries retained in the same-window cooldown history before the
/// oldest (by insertion order) is evicted — an unbounded map would leak
/// memory across a long-running session that visits many distinct windows.
const WINDOW_HASH_HISTORY_LIMIT: usize = 1000;

/// FIFO-eviction map of window hash -> last-seen instant, mirroring the
/// reference agent's `OrderedDict` + `popitem(last=False)` pruning.
struct WindowHistory {
    last_seen: HashMap<String, Instant>,
    insertion_order: VecDeque<String>,
}

impl WindowHistory {
    fn new() -> Self {
        Self { last_seen: HashMap::new(), insertion_order: VecDeque::new() }
    }

    fn record(&mut self, hash: String, now: Instant) {
        if !self.last_seen.contains_key(&hash) {
            self.insertion_order.push_back(hash.clone());
        }
        self.last_seen.insert(hash, now);
        while self.last_seen.len() > WINDOW_HASH_HISTORY_LIMIT {
            if let Some(oldest) = self.insertion_order.pop_front() {
                self.last_seen.remove(&oldest);
            }
        }
    }

    fn last_seen_at(&self, hash: &str) -> Option<Instant> {
        self.last_seen.get(hash).copied()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.last_seen.len()
    }
}

/// Decides whether the current tick should fire a capture, applying the
/// same three gates `run_session`'s inner loop applies in order: the global
/// cooldown, the same-window cooldown (keyed by window hash history), and
/// the focus-change-vs-constant-window rule (Rule A: a recent focus change
/// always fires; Rule B: an unchanged window only fires once
/// `constant_window_cd` has elapsed since the shot that preceded it).
fn should_capture(
    elapsed_since_shot: Duration,
    elapsed_constant: Duration,
    same_window_last_seen: Option<Duration>,
    timings: &Timings,
) -> bool {
    if elapsed_since_shot < timings.global_cd {
        return false;
    }
    if let Some(last_seen) = same_window_last_seen {
        if last_seen < timings.same_window_cd {
            return false;
        }
    }
    if elapsed_constant >= timings.global_cd && elapsed_since_shot < timings.constant_window_cd {
        return false;
    }
    true
}

/// Downscales `image` so neither dimension exceeds `max_side`, preserving
/// aspect ratio. Mirrors `PIL.Image.thumbnail`: never scales up.
fn thumbnail(image: CapturedImage, max_side: u32) -> CapturedImage {
    if image.width <= max_side && image.height <= max_side || image.width == 0 || image.height == 0 {
        return image;
    }
    let ratio = (max_side as f64 / image.width as f64).min(max_side as f64 / image.height as f64);
    let new_w = ((image.width as f64) * ratio).round().max(1.0) as u32;
    let new_h = ((image.height as f64) * ratio).round().max(1.0) as u32;
    let Some(buf) = image::RgbImage::from_raw(image.width, image.height, image.rgb) else {
        return CapturedImage::new(image.width, image.height, Vec::new());
    };
    let resized = image::imageops::thumbnail(&buf, new_w, new_h);
    CapturedImage::new(resized.width(), resized.height(), resized.into_raw())
}

pub struct CaptureScheduler {
    config: Arc<RwLock<UserConfig>>,
    timings: Timings,
    platform: Platform,
    display_server: DisplayServer,
    events: mpsc::Sender<CaptureEvent>,
}

impl CaptureScheduler {
    pub fn new(
        config: Arc<RwLock<UserConfig>>,
        timings: Timings,
        platform: Platform,
        display_server: DisplayServer,
        events: mpsc::Sender<CaptureEvent>,
    ) -> Self {
        Self { config, timings, platform, display_server, events }
    }

    async fn is_paired(&self) -> bool {
        self.config.read().await.is_paired()
    }

    async fn fetch_window(
        provider: &Arc<dyn WindowInfoProvider>,
        retries: u32,
        retry_cooldown: Duration,
    ) -> Option<crate::models::WindowInfo> {
        let provider = provider.clone();
        match tokio::task::spawn_blocking(move || {
            get_active_window_if_relevant(provider.as_ref(), retries, retry_cooldown)
        })
        .await
        {
            Ok(Ok(window)) => window,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "active-window query failed");
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "active-window query task panicked");
                None
            }
        }
    }

    /// Runs forever; intended to be spawned as its own task.
    pub async fn run(self, provider: Arc<dyn WindowInfoProvider>) {
        loop {
            if !self.is_paired().await {
                tokio::time::sleep(PAIRING_POLL_INTERVAL).await;
                continue;
            }

            let Some(session_first_window) = self.bootstrap_first_window(&provider).await else {
                continue;
            };

            self.run_session(provider.clone(), session_first_window).await;
        }
    }

    /// Polls for the first relevant window, bailing out (to let the outer
    /// loop re-check pairing) if pairing is lost while waiting.
    async fn bootstrap_first_window(
        &self,
        provider: &Arc<dyn WindowInfoProvider>,
    ) -> Option<crate::models::WindowInfo> {
        loop {
            if !self.is_paired().await {
                return None;
            }
            if let Some(window) =
                Self::fetch_window(provider, WINDOW_QUERY_RETRIES, self.timings.active_window_poll_interval).await
            {
                return Some(window);
            }
            tracing::warn!("no active window detected, retrying");
            tokio::time::sleep(self.timings.active_window_poll_interval).await;
        }
    }

    /// Runs the cooldown state machine for one paired session, until
    /// pairing is lost or the platform has no screenshot backend.
    async fn run_session(&self, provider: Arc<dyn WindowInfoProvider>, first_window: crate::models::WindowInfo) {
        let idle_detector = crate::platform::create_idle_detector(self.platform, self.display_server);
        let mut idle_scope = match IdleScope::enter(idle_detector).await {
            Ok(scope) => scope,
            Err(e) => {
                tracing::error!(error = %e, "failed to start idle detector");
                tokio::time::sleep(self.timings.active_window_poll_interval).await;
                return;
            }
        };

        let screenshotter = crate::platform::create_screenshotter(self.platform, self.display_server);
        let mut screenshot_scope = match ScreenshotScope::enter(screenshotter).await {
            Ok(scope) => scope,
            Err(e) => {
                tracing::warn!(error = %e, "screenshots not supported on this platform/display");
                idle_scope.release().await;
                tokio::time::sleep(self.timings.active_window_poll_interval).await;
                return;
            }
        };

        let mut prev_window = first_window;
        let now = Instant::now();
        let mut last_shot_at = now;
        let mut last_change_at = now;
        let mut prev_hash = prev_window.hash();
        let mut history = WindowHistory::new();
        history.record(prev_hash.clone(), now);
        let mut is_afk = false;

        if let Err(e) = self
            .capture_and_publish(&mut screenshot_scope.screenshotter, &prev_window)
            .await
        {
            tracing::error!(error = %e, "initial screenshot failed");
        }

        loop {
            if !self.is_paired().await {
                break;
            }

            let now = Instant::now();
            let idle_secs = idle_scope.detector.idle_seconds().await;

            if idle_secs > self.timings.afk_timeout.as_secs_f64() {
                if !is_afk {
                    let _ = self
                        .events
                        .send(CaptureEvent::AfkStart(AfkStart {
                            id: Uuid::new_v4(),
                            timestamp: Utc::now(),
                            time_since_last_user_activity: idle_secs,
                        }))
                        .await;
                    is_afk = true;
                }
                tokio::time::sleep(self.timings.active_window_poll_interval).await;
                continue;
            }
            is_afk = false;

            if now.duration_since(last_shot_at) < self.timings.global_cd {
                tokio::time::sleep(self.timings.active_window_poll_interval).await;
                continue;
            }

            let Some(cur_window) = Self::fetch_window(&provider, WINDOW_QUERY_RETRIES, Duration::from_millis(20)).await
            else {
                tracing::warn!("no active window found, skipping iteration");
                tokio::time::sleep(self.timings.active_window_poll_interval).await;
                continue;
            };

            let cur_hash = cur_window.hash();
            if cur_hash != prev_hash {
                last_change_at = now;
                prev_hash = cur_hash.clone();
            }

            let elapsed_since_shot = now.duration_since(last_shot_at);
            let elapsed_constant = now.duration_since(last_change_at);
            let same_window_last_seen = history.last_seen_at(&cur_hash).map(|t| now.duration_since(t));

            if !should_capture(elapsed_since_shot, elapsed_constant, same_window_last_seen, &self.timings) {
                prev_window = cur_window;
                tokio::time::sleep(self.timings.active_window_poll_interval).await;
                continue;
            }

            if let Err(e) = self.capture_and_publish(&mut screenshot_scope.screenshotter, &cur_window).await {
                tracing::error!(error = %e, "capture loop error");
            } else {
                last_shot_at = now;
                history.record(cur_hash, now);
            }
            prev_window = cur_window;

            tokio::time::sleep(self.timings.active_window_poll_interval).await;
        }

        screenshot_scope.release().await;
        idle_scope.release().await;
    }

    async fn capture_and_publish(
        &self,
        screenshotter: &mut Box<dyn crate::platform::Screenshotter>,
        window: &crate::models::WindowInfo,
    ) -> Result<(), crate::platform::ScreenshotError> {
        let raw = screenshotter.capture(window.bbox).await?;
        let screenshot = thumbnail(raw, self.timings.screenshot_max_side);
        tracing::debug!(
            title = %window.title,
            app = %window.app_name,
            width = screenshot.width,
            height = screenshot.height,
            "captured screenshot"
        );
        let event = CaptureEvent::DesktopCheck(DesktopCheck {
            id: Uuid::new_v4(),
            screenshot,
            active_window: window.clone(),
            timestamp: Utc::now(),
            time_since_last_user_activity: 0.0,
            bbox: window.bbox,
        });
        let _ = self.events.send(event).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Bbox;

    #[test]
    fn test_window_history_prunes_oldest_past_limit() {
        let mut history = WindowHistory::new();
        let base = Instant::now();
        for i in 0..(WINDOW_HASH_HISTORY_LIMIT + 10) {
            history.record(format!("hash-{i}"), base);
        }
        assert_eq!(history.len(), WINDOW_HASH_HISTORY_LIMIT);
        assert!(history.last_seen_at("hash-0").is_none());
        assert!(history.last_seen_at(&format!("hash-{}", WINDOW_HASH_HISTORY_LIMIT + 9)).is_some());
    }

    #[test]
    fn test_window_history_update_keeps_insertion_position() {
        let mut history = WindowHistory::new();
        let t0 = Instant::now();
        history.record("a".into(), t0);
        history.record("b".into(), t0);
        // Re-recording "a" updates its timestamp but not its insertion slot;
        // filling past the limit should still evict "a" first.
        let t1 = Instant::now();
        history.record("a".into(), t1);
        for i in 0..WINDOW_HASH_HISTORY_LIMIT {
            history.record(format!("filler-{i}"), t1);
        }
        assert!(history.last_seen_at("a").is_none());
        assert!(history.last_seen_at("b").is_some());
    }

    #[test]
    fn test_focus_change_burst_suppressed_then_fires() {
        let timings = Timings::default();
        // Switch to a new window 1s after the last shot: global cooldown not
        // yet elapsed, suppressed even though it's a fresh window.
        assert!(!should_capture(Duration::from_secs(1), Duration::from_secs(1), None, &timings));
        // Once global_cd has elapsed, a focus change that just happened
        // (elapsed_constant well under global_cd) fires via Rule A even
        // though there's no prior history for this window hash.
        assert!(should_capture(Duration::from_secs(6), Duration::from_secs(0), None, &timings));
    }

    #[test]
    fn test_constant_window_heartbeat_waits_for_constant_window_cd() {
        let timings = Timings::default();
        // Same window the whole time: global cooldown has long elapsed but
        // Rule B holds it back until constant_window_cd.
        assert!(!should_capture(Duration::from_secs(20), Duration::from_secs(20), None, &timings));
        assert!(should_capture(Duration::from_secs(30), Duration::from_secs(30), None, &timings));
    }

    #[test]
    fn test_same_window_cooldown_blocks_rapid_alternation() {
        let timings = Timings::default();
        // Window was last captured under this same hash 5s ago: still inside
        // same_window_cd (15s), blocked regardless of the other gates.
        assert!(!should_capture(
            Duration::from_secs(10),
            Duration::from_secs(0),
            Some(Duration::from_secs(5)),
            &timings
        ));
        // Focus returns to a window last captured 20s ago (clears
        // same_window_cd) right as the switch happens (elapsed_constant
        // near zero), so Rule A lets it through immediately.
        assert!(should_capture(
            Duration::from_secs(20),
            Duration::from_secs(0),
            Some(Duration::from_secs(20)),
            &timings
        ));
    }

    #[test]
    fn test_thumbnail_leaves_small_image_untouched() {
        let image = CapturedImage::new(100, 50, vec![0u8; 100 * 50 * 3]);
        let out = thumbnail(image, 1024);
        assert_eq!((out.width, out.height), (100, 50));
    }

    #[test]
    fn test_thumbnail_scales_down_preserving_aspect() {
        let image = CapturedImage::new(2048, 1024, vec![0u8; 2048 * 1024 * 3]);
        let out = thumbnail(image, 1024);
        assert_eq!(out.width, 1024);
        assert_eq!(out.height, 512);
    }

    #[test]
    fn test_bbox_used_for_capture_matches_window_bbox() {
        let bbox = Bbox::new(0, 0, 800, 600);
        assert_eq!(bbox.area(), 480_000);
    }
}
