//! Native (library-based) window-info provider for Windows, macOS, and X11.

use std::thread;
use std::time::Duration;

use crate::models::{Bbox, WindowInfo};

use super::{WindowInfoError, WindowInfoProvider};

/// Reports the foreground window using the platform's native windowing
/// APIs. Used on Windows, macOS, and Linux/X11.
pub struct NativeWindowInfoProvider;

impl NativeWindowInfoProvider {
    pub fn new() -> Self {
        Self
    }

    fn query_once(&self) -> Result<Option<(WindowInfo, Vec<Bbox>)>, WindowInfoError> {
        #[cfg(target_os = "windows")]
        {
            return windows_impl::query();
        }
        #[cfg(target_os = "macos")]
        {
            return macos_impl::query();
        }
        #[cfg(all(target_os = "linux", not(target_os = "windows"), not(target_os = "macos")))]
        {
            return x11_impl::query();
        }
        #[allow(unreachable_code)]
        Err(WindowInfoError::UnsupportedCompositor(
            "no native backend for this target".to_string(),
        ))
    }
}

impl Default for NativeWindowInfoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowInfoProvider for NativeWindowInfoProvider {
    fn active_window(
        &self,
        retries: u32,
        retry_cooldown: Duration,
    ) -> Result<(Option<WindowInfo>, Vec<Bbox>), WindowInfoError> {
        let mut attempt = 0;
        loop {
            match self.query_once() {
                Ok(Some((window, monitors))) => return Ok((Some(window), monitors)),
                Ok(None) if attempt < retries => {
                    attempt += 1;
                    thread::sleep(retry_cooldown);
                }
                Ok(None) => return Ok((None, Vec::new())),
                Err(e) if attempt < retries => {
                    tracing::debug!(error = %e, attempt, "native window query failed, retrying");
                    attempt += 1;
                    thread::sleep(retry_cooldown);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(target_os = "windows")]
mod windows_impl {
    use super::*;
    use windows::Win32::Foundation::{HWND, RECT};
    use windows::Win32::UI::WindowsAndMessaging::{
        GetForegroundWindow, GetWindowRect, GetWindowTextW, GetWindowThreadProcessId,
    };

    pub(super) fn query() -> Result<Option<(WindowInfo, Vec<Bbox>)>, WindowInfoError> {
        unsafe {
            let hwnd: HWND = GetForegroundWindow();
            if hwnd.0.is_null() {
                return Ok(None);
            }

            let mut title_buf = [0u16; 512];
            let len = GetWindowTextW(hwnd, &mut title_buf);
            let title = String::from_utf16_lossy(&title_buf[..len.max(0) as usize]);

            let mut rect = RECT::default();
            GetWindowRect(hwnd, &mut rect)
                .map_err(|e| WindowInfoError::Transient(e.to_string()))?;

            let mut pid: u32 = 0;
            GetWindowThreadProcessId(hwnd, Some(&mut pid));

            let bbox = Bbox::new(rect.left, rect.top, rect.right - rect.left, rect.bottom - rect.top);
            let window = WindowInfo {
                title,
                app_name: format!("pid:{pid}"),
                bbox,
                monitor_names: vec![],
            };
            let monitors = monitor_bboxes();
            Ok(Some((window, monitors)))
        }
    }

    fn monitor_bboxes() -> Vec<Bbox> {
        // A single-monitor fallback; multi-monitor enumeration would use
        // EnumDisplayMonitors, omitted here for the common single-display case.
        vec![Bbox::new(
            0,
            0,
            unsafe { windows::Win32::Graphics::Gdi::GetDeviceCaps(None, windows::Win32::Graphics::Gdi::HORZRES.0) },
            unsafe { windows::Win32::Graphics::Gdi::GetDeviceCaps(None, windows::Win32::Graphics::Gdi::VERTRES.0) },
        )]
    }
}

#[cfg(target_os = "macos")]
mod macos_impl {
    use super::*;
    use std::process::Command;

    /// Queries the frontmost application and its key window's bounds via
    /// System Events, the same AppleScript-subprocess approach used
    /// elsewhere on this platform to avoid linking against private
    /// Accessibility frameworks.
    pub(super) fn query() -> Result<Option<(WindowInfo, Vec<Bbox>)>, WindowInfoError> {
        let script = r#"
            tell application "System Events"
                set frontApp to first application process whose frontmost is true
                set appName to name of frontApp
                try
                    set win to front window of frontApp
                    set winTitle to name of win
                    set winPos to position of win
                    set winSize to size of win
                    return appName & "|" & winTitle & "|" & (item 1 of winPos) & "," & (item 2 of winPos) & "," & (item 1 of winSize) & "," & (item 2 of winSize)
                on error
                    return appName & "||"
                end try
            end tell
        "#;
        let output = Command::new("/usr/bin/osascript")
            .arg("-e")
            .arg(script)
            .output()
            .map_err(|e| WindowInfoError::Transient(e.to_string()))?;
        if !output.status.success() {
            return Err(WindowInfoError::Transient(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let mut parts = text.splitn(3, '|');
        let app_name = parts.next().unwrap_or_default().to_string();
        let title = parts.next().unwrap_or_default().to_string();
        let geom = parts.next().unwrap_or_default();

        let bbox = parse_geometry(geom).unwrap_or(Bbox::new(0, 0, 0, 0));
        if bbox.width == 0 && bbox.height == 0 {
            return Ok(None);
        }
        let window = WindowInfo { title, app_name, bbox, monitor_names: vec![] };
        Ok(Some((window, vec![primary_monitor_bbox()])))
    }

    fn parse_geometry(s: &str) -> Option<Bbox> {
        let nums: Vec<i32> = s.split(',').filter_map(|p| p.trim().parse().ok()).collect();
        if nums.len() != 4 {
            return None;
        }
        Some(Bbox::new(nums[0], nums[1], nums[2], nums[3]))
    }

    fn primary_monitor_bbox() -> Bbox {
        // core-graphics main-display bounds queried via AppleScript to avoid
        // a direct CoreGraphics FFI dependency for a single rectangle.
        let script = "tell application \"Finder\" to get bounds of window of desktop";
        if let Ok(output) = Command::new("/usr/bin/osascript").arg("-e").arg(script).output() {
            let text = String::from_utf8_lossy(&output.stdout);
            let nums: Vec<i32> = text.trim().split(", ").filter_map(|p| p.trim().parse().ok()).collect();
            if nums.len() == 4 {
                return Bbox::new(nums[0], nums[1], nums[2] - nums[0], nums[3] - nums[1]);
            }
        }
        Bbox::new(0, 0, 1920, 1080)
    }
}

#[cfg(all(target_os = "linux", not(target_os = "windows"), not(target_os = "macos")))]
mod x11_impl {
    use super::*;
    use x11rb::connection::Connection;
    use x11rb::protocol::xproto::{self, ConnectionExt as _};
    use x11rb::protocol::randr::ConnectionExt as _;

    pub(super) fn query() -> Result<Option<(WindowInfo, Vec<Bbox>)>, WindowInfoError> {
        let (conn, screen_num) = x11rb::connect(None)
            .map_err(|e| WindowInfoError::Transient(e.to_string()))?;
        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;

        let net_active_window = intern_atom(&conn, "_NET_ACTIVE_WINDOW")?;
        let net_wm_name = intern_atom(&conn, "_NET_WM_NAME")?;
        let utf8_string = intern_atom(&conn, "UTF8_STRING")?;
        let net_wm_class = intern_atom(&conn, xproto::AtomEnum::WM_CLASS.into())?;

        let active = xproto::get_property(&conn, false, root, net_active_window, xproto::AtomEnum::WINDOW, 0, 1)
            .map_err(|e| WindowInfoError::Transient(e.to_string()))?
            .reply()
            .map_err(|e| WindowInfoError::Transient(e.to_string()))?;
        let window_id = match active.value32().and_then(|mut v| v.next()) {
            Some(id) if id != 0 => id,
            _ => return Ok(None),
        };

        let title = get_utf8_property(&conn, window_id, net_wm_name, utf8_string)
            .unwrap_or_default();
        let class = get_text_property(&conn, window_id, net_wm_class).unwrap_or_default();
        let app_name = class
            .split('\0')
            .last()
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let geom = xproto::get_geometry(&conn, window_id)
            .map_err(|e| WindowInfoError::Transient(e.to_string()))?
            .reply()
            .map_err(|e| WindowInfoError::Transient(e.to_string()))?;
        let translated = xproto::translate_coordinates(&conn, window_id, root, 0, 0)
            .map_err(|e| WindowInfoError::Transient(e.to_string()))?
            .reply()
            .map_err(|e| WindowInfoError::Transient(e.to_string()))?;

        let bbox = Bbox::new(
            translated.dst_x as i32,
            translated.dst_y as i32,
            geom.width as i32,
            geom.height as i32,
        );

        let monitors = monitor_bboxes(&conn, root)?;
        let window = WindowInfo { title, app_name, bbox, monitor_names: vec![] };
        Ok(Some((window, monitors)))
    }

    fn intern_atom(
        conn: &impl Connection,
        name: impl AtomNameSource,
    ) -> Result<xproto::Atom, WindowInfoError> {
        name.resolve(conn)
    }

    trait AtomNameSource {
        fn resolve(self, conn: &impl Connection) -> Result<xproto::Atom, WindowInfoError>;
    }
    impl AtomNameSource for &str {
        fn resolve(self, conn: &impl Connection) -> Result<xproto::Atom, WindowInfoError> {
            conn.intern_atom(false, self.as_bytes())
                .map_err(|e| WindowInfoError::Transient(e.to_string()))?
                .reply()
                .map(|r| r.atom)
                .map_err(|e| WindowInfoError::Transient(e.to_string()))
        }
    }
    impl AtomNameSource for xproto::Atom {
        fn resolve(self, _conn: &impl Connection) -> Result<xproto::Atom, WindowInfoError> {
            Ok(self)
        }
    }

    fn get_utf8_property(
        conn: &impl Connection,
        window: xproto::Window,
        atom: xproto::Atom,
        utf8_type: xproto::Atom,
    ) -> Option<String> {
        let reply = xproto::get_property(conn, false, window, atom, utf8_type, 0, u32::MAX)
            .ok()?
            .reply()
            .ok()?;
        String::from_utf8(reply.value).ok()
    }

    fn get_text_property(
        conn: &impl Connection,
        window: xproto::Window,
        atom: xproto::Atom,
    ) -> Option<String> {
        let reply = xproto::get_property(conn, false, window, atom, xproto::AtomEnum::STRING, 0, u32::MAX)
            .ok()?
            .reply()
            .ok()?;
        String::from_utf8(reply.value).ok()
    }

    fn monitor_bboxes(conn: &impl Connection, root: xproto::Window) -> Result<Vec<Bbox>, WindowInfoError> {
        let resources = conn
            .randr_get_screen_resources(root)
            .map_err(|e| WindowInfoError::Transient(e.to_string()))?
            .reply()
            .map_err(|e| WindowInfoError::Transient(e.to_string()))?;
        let mut monitors = Vec::new();
        for crtc in resources.crtcs {
            if let Ok(info) = conn
                .randr_get_crtc_info(crtc, resources.config_timestamp)
                .and_then(|c| c.reply())
            {
                if info.width > 0 && info.height > 0 {
                    monitors.push(Bbox::new(info.x as i32, info.y as i32, info.width as i32, info.height as i32));
                }
            }
        }
        if monitors.is_empty() {
            let screen = &conn.setup().roots[0];
            monitors.push(Bbox::new(0, 0, screen.width_in_pixels as i32, screen.height_in_pixels as i32));
        }
        Ok(monitors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_provider_constructs() {
        let _provider = NativeWindowInfoProvider::new();
    }
}
