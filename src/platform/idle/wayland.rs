//! Linux/Wayland idle detection: a cascade of DBus-based idle sources.
//!
//! Wayland gives no portable "seconds since last input" query, so this
//! backend tries, in order, every idle source a compositor might expose and
//! returns the first one that answers: GNOME Mutter's `IdleMonitor`, the
//! freedesktop `ScreenSaver` interface (KDE and others), the XDG desktop
//! portal's `Inhibit` idle monitor (Hyprland, sway via `xdg-desktop-portal-
//! wlr`), systemd-logind's `IdleHint`/`IdleSinceHintMonotonic` session
//! properties — first via a live signal subscription, then via `loginctl`,
//! then via one final one-shot `GetAll` property fetch on a fresh
//! connection — and finally `0.0` if nothing answers.
//!
//! The portal and logind probes are persistent: once a monitor is
//! established it is kept open for the life of this detector (subsequent
//! calls read the cached timestamp) rather than reconnecting every poll.
//! A probe that fails is marked failed and skipped on every later call
//! within the same scope, matching the "don't keep retrying a dead bus"
//! behavior of the reference idle daemon.

use std::collections::HashMap;
use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use zbus::zvariant::{ObjectPath, OwnedValue, Value};
use zbus::{proxy, Connection, MatchRule, Message, MessageStream, MessageType};

use super::{IdleDetector, IdleError};

const DBUS_CALL_TIMEOUT: Duration = Duration::from_secs(2);

#[proxy(
    interface = "org.gnome.Mutter.IdleMonitor",
    default_service = "org.gnome.Mutter.IdleMonitor",
    default_path = "/org/gnome/Mutter/IdleMonitor/Core"
)]
trait MutterIdleMonitor {
    async fn get_idletime(&self) -> zbus::Result<u64>;
}

#[proxy(
    interface = "org.freedesktop.ScreenSaver",
    default_service = "org.freedesktop.ScreenSaver",
    default_path = "/ScreenSaver"
)]
trait FreedesktopScreenSaver {
    async fn get_session_idle_time(&self) -> zbus::Result<u32>;
}

struct PortalMonitor {
    _connection: Connection,
    idle_since: Arc<Mutex<Option<Instant>>>,
    _listener: JoinHandle<()>,
}

struct LogindMonitor {
    _connection: Connection,
    idle_since: Arc<Mutex<Option<Instant>>>,
    _listener: JoinHandle<()>,
}

pub struct WaylandIdleDetector {
    portal: Option<PortalMonitor>,
    portal_failed: bool,
    logind: Option<LogindMonitor>,
    logind_failed: bool,
}

impl WaylandIdleDetector {
    pub fn new() -> Self {
        Self { portal: None, portal_failed: false, logind: None, logind_failed: false }
    }

    async fn try_mutter(&self) -> Option<f64> {
        let conn = Connection::session().await.ok()?;
        let proxy = MutterIdleMonitorProxy::new(&conn).await.ok()?;
        let idletime_ms = tokio::time::timeout(DBUS_CALL_TIMEOUT, proxy.get_idletime())
            .await
            .ok()?
            .ok()?;
        Some(idletime_ms as f64 / 1000.0)
    }

    async fn try_screensaver(&self) -> Option<f64> {
        let conn = Connection::session().await.ok()?;
        let proxy = FreedesktopScreenSaverProxy::new(&conn).await.ok()?;
        let idle_secs = tokio::time::timeout(DBUS_CALL_TIMEOUT, proxy.get_session_idle_time())
            .await
            .ok()?
            .ok()?;
        Some(idle_secs as f64)
    }

    async fn ensure_portal_monitor(&mut self) -> bool {
        if self.portal_failed {
            return false;
        }
        if self.portal.is_some() {
            return true;
        }
        match Self::start_portal_monitor().await {
            Ok(monitor) => {
                self.portal = Some(monitor);
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "XDG portal idle monitor unavailable");
                self.portal_failed = true;
                false
            }
        }
    }

    async fn start_portal_monitor() -> zbus::Result<PortalMonitor> {
        let connection = Connection::session().await?;
        let token = format!("clepsy{}", uuid::Uuid::new_v4().simple());
        let mut options: HashMap<&str, Value> = HashMap::new();
        options.insert("session_handle_token", Value::from(token));

        tokio::time::timeout(
            DBUS_CALL_TIMEOUT,
            connection.call_method(
                Some("org.freedesktop.portal.Desktop"),
                "/org/freedesktop/portal/desktop",
                Some("org.freedesktop.portal.Inhibit"),
                "CreateMonitor",
                &("", options),
            ),
        )
        .await
        .map_err(|_| zbus::Error::Failure("CreateMonitor timed out".into()))??;

        let rule = MatchRule::builder()
            .msg_type(MessageType::Signal)
            .interface("org.freedesktop.portal.Inhibit")?
            .member("StateChanged")?
            .build();
        let dbus_proxy = zbus::fdo::DBusProxy::new(&connection).await?;
        dbus_proxy.add_match_rule(rule).await?;

        let idle_since: Arc<Mutex<Option<Instant>>> = Arc::new(Mutex::new(None));
        let idle_since_task = idle_since.clone();
        let mut stream = MessageStream::from(connection.clone());
        let listener = tokio::spawn(async move {
            while let Some(Ok(message)) = stream.next().await {
                if !is_signal(&message, "org.freedesktop.portal.Inhibit", "StateChanged") {
                    continue;
                }
                let Ok((_handle, state)) = message.body::<(ObjectPath, HashMap<String, Value>)>() else {
                    continue;
                };
                let idle = state.get("idle").and_then(|v| bool::try_from(v.clone()).ok()).unwrap_or(false);
                if idle {
                    let since_ms = state
                        .get("since")
                        .and_then(|v| u64::try_from(v.clone()).ok())
                        .unwrap_or(0);
                    let since_secs = since_ms as f64 / 1000.0;
                    let mut guard = idle_since_task.lock().await;
                    *guard = Instant::now().checked_sub(Duration::from_secs_f64(since_secs));
                } else {
                    let mut guard = idle_since_task.lock().await;
                    *guard = None;
                }
            }
        });

        Ok(PortalMonitor { _connection: connection, idle_since, _listener: listener })
    }

    async fn ensure_logind_monitor(&mut self) -> bool {
        if self.logind_failed {
            return false;
        }
        if self.logind.is_some() {
            return true;
        }
        match Self::start_logind_monitor().await {
            Ok(monitor) => {
                self.logind = Some(monitor);
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "logind idle monitor unavailable");
                self.logind_failed = true;
                false
            }
        }
    }

    /// Finds the logind session object path for the current user via a
    /// fresh `ListSessions` call on `connection`.
    async fn find_session_path(connection: &Connection) -> zbus::Result<ObjectPath<'static>> {
        let reply = tokio::time::timeout(
            DBUS_CALL_TIMEOUT,
            connection.call_method(
                Some("org.freedesktop.login1"),
                "/org/freedesktop/login1",
                Some("org.freedesktop.login1.Manager"),
                "ListSessions",
                &(),
            ),
        )
        .await
        .map_err(|_| zbus::Error::Failure("ListSessions timed out".into()))??;
        let sessions: Vec<(String, u32, String, String, ObjectPath)> = reply.body().deserialize()?;

        let uid = unsafe { libc::getuid() };
        let username = std::env::var("USER").unwrap_or_default();
        sessions
            .into_iter()
            .find(|(_, session_uid, user, ..)| *session_uid == uid || *user == username)
            .map(|(_, _, _, _, path)| path.to_owned())
            .ok_or_else(|| zbus::Error::Failure("no logind session for current user".into()))
    }

    async fn start_logind_monitor() -> zbus::Result<LogindMonitor> {
        let connection = Connection::system().await?;
        let session_path = Self::find_session_path(&connection).await?;

        let rule = MatchRule::builder()
            .msg_type(MessageType::Signal)
            .path(session_path.as_ref())?
            .interface("org.freedesktop.DBus.Properties")?
            .member("PropertiesChanged")?
            .build();
        let dbus_proxy = zbus::fdo::DBusProxy::new(&connection).await?;
        dbus_proxy.add_match_rule(rule).await?;

        let idle_since: Arc<Mutex<Option<Instant>>> = Arc::new(Mutex::new(None));

        let initial = Self::fetch_session_idle_since(&connection, &session_path).await;
        *idle_since.lock().await = initial;

        let idle_since_task = idle_since.clone();
        let watched_path = session_path.to_owned();
        let mut stream = MessageStream::from(connection.clone());
        let listener = tokio::spawn(async move {
            while let Some(Ok(message)) = stream.next().await {
                if !is_signal(&message, "org.freedesktop.DBus.Properties", "PropertiesChanged") {
                    continue;
                }
                if message.path().map(|p| p != watched_path.as_ref()).unwrap_or(true) {
                    continue;
                }
                let Ok((interface, changed, _invalidated)) =
                    message.body::<(String, HashMap<String, OwnedValue>, Vec<String>)>()
                else {
                    continue;
                };
                if interface != "org.freedesktop.login1.Session" {
                    continue;
                }
                let Some(idle_hint) = changed.get("IdleHint").and_then(|v| bool::try_from(v.clone()).ok())
                else {
                    continue;
                };
                let mut guard = idle_since_task.lock().await;
                if idle_hint {
                    *guard = changed
                        .get("IdleSinceHintMonotonic")
                        .and_then(|v| u64::try_from(v.clone()).ok())
                        .and_then(|since_us| Instant::now().checked_sub(Duration::from_micros(since_us)))
                        .or(Some(Instant::now()));
                } else {
                    *guard = None;
                }
            }
        });

        Ok(LogindMonitor { _connection: connection, idle_since, _listener: listener })
    }

    async fn fetch_session_idle_since(connection: &Connection, session_path: &ObjectPath<'_>) -> Option<Instant> {
        let reply = tokio::time::timeout(
            DBUS_CALL_TIMEOUT,
            connection.call_method(
                Some("org.freedesktop.login1"),
                session_path,
                Some("org.freedesktop.DBus.Properties"),
                "GetAll",
                &("org.freedesktop.login1.Session",),
            ),
        )
        .await
        .ok()?
        .ok()?;
        let props: HashMap<String, OwnedValue> = reply.body().deserialize().ok()?;
        let idle_hint = props.get("IdleHint").and_then(|v| bool::try_from(v.clone()).ok()).unwrap_or(false);
        if !idle_hint {
            return None;
        }
        let since_us = props
            .get("IdleSinceHintMonotonic")
            .and_then(|v| u64::try_from(v.clone()).ok())
            .unwrap_or(0);
        if since_us == 0 {
            return Some(Instant::now());
        }
        Instant::now().checked_sub(Duration::from_micros(since_us))
    }

    fn loginctl_idle_seconds_blocking() -> Option<f64> {
        let session_id = std::env::var("XDG_SESSION_ID").ok()?;
        let output = Command::new("loginctl")
            .args(["show-session", &session_id, "-p", "IdleHint", "-p", "IdleSinceHintMonotonic"])
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let text = String::from_utf8_lossy(&output.stdout);
        let kv: HashMap<&str, &str> = text
            .lines()
            .filter_map(|line| line.split_once('='))
            .collect();
        if kv.get("IdleHint").copied() != Some("yes") {
            return Some(0.0);
        }
        let since_us: u64 = kv.get("IdleSinceHintMonotonic").and_then(|s| s.parse().ok()).unwrap_or(0);
        if since_us == 0 {
            return Some(0.0);
        }
        let uptime_text = std::fs::read_to_string("/proc/uptime").ok()?;
        let uptime_s: f64 = uptime_text.split_whitespace().next()?.parse().ok()?;
        let idle_us = (uptime_s * 1_000_000.0) as i128 - since_us as i128;
        Some((idle_us.max(0) as f64) / 1_000_000.0)
    }

    async fn loginctl_idle_seconds(&self) -> Option<f64> {
        tokio::task::spawn_blocking(Self::loginctl_idle_seconds_blocking).await.ok()?
    }

    /// Last-resort logind lookup: a fresh, one-shot system-bus connection
    /// and property fetch, independent of the persistent logind monitor
    /// (which may itself be unavailable or simply not yet have observed an
    /// idle transition). Tried after `loginctl` fails, before giving up.
    async fn one_shot_logind_idle_seconds(&self) -> Option<f64> {
        let connection = Connection::system().await.ok()?;
        let session_path = Self::find_session_path(&connection).await.ok()?;
        match Self::fetch_session_idle_since(&connection, &session_path).await {
            Some(since) => Some(since.elapsed().as_secs_f64()),
            None => Some(0.0),
        }
    }
}

fn is_signal(message: &Message, interface: &str, member: &str) -> bool {
    let header = message.header();
    header.message_type() == MessageType::Signal
        && header.interface().map(|i| i.as_str()) == Some(interface)
        && header.member().map(|m| m.as_str()) == Some(member)
}

impl Default for WaylandIdleDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdleDetector for WaylandIdleDetector {
    fn is_async(&self) -> bool {
        true
    }

    async fn start(&mut self) -> Result<(), IdleError> {
        Ok(())
    }

    async fn idle_seconds(&mut self) -> f64 {
        if let Some(idle) = self.try_mutter().await {
            return idle;
        }
        if let Some(idle) = self.try_screensaver().await {
            return idle;
        }
        if self.ensure_portal_monitor().await {
            if let Some(monitor) = &self.portal {
                if let Some(since) = *monitor.idle_since.lock().await {
                    return since.elapsed().as_secs_f64();
                }
            }
        }
        if self.ensure_logind_monitor().await {
            if let Some(monitor) = &self.logind {
                if let Some(since) = *monitor.idle_since.lock().await {
                    return since.elapsed().as_secs_f64();
                }
            }
        }
        if let Some(idle) = self.loginctl_idle_seconds().await {
            return idle;
        }
        if let Some(idle) = self.one_shot_logind_idle_seconds().await {
            return idle;
        }
        0.0
    }

    async fn stop(&mut self) {
        self.portal = None;
        self.logind = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_async_true() {
        let detector = WaylandIdleDetector::new();
        assert!(detector.is_async());
    }

    #[test]
    fn test_loginctl_parses_missing_session_as_none() {
        std::env::remove_var("XDG_SESSION_ID");
        assert_eq!(WaylandIdleDetector::loginctl_idle_seconds_blocking(), None);
    }
}
