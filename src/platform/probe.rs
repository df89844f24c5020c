//! Platform and display-server classification.
//!
//! Pure, side-effect-free beyond reading environment variables and
//! checking for the presence of a handful of compositor binaries on
//! `PATH`. Repeated calls against an unchanged environment always produce
//! the same classification.

use std::path::Path;

/// The operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOS,
    Linux,
    Unknown,
}

/// The windowing system in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayServer {
    Win32,
    Cocoa,
    X11,
    Wayland,
    Unknown,
}

/// Under Wayland, which compositor family is running. Only wlroots-style
/// compositors (Hyprland, Sway) support unattended screen capture via
/// `grim`; everything else is unsupported for this agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaylandCompositor {
    Hyprland,
    Sway,
    Other,
}

/// Detects the running platform from `cfg!` target info.
pub fn detect_platform() -> Platform {
    if cfg!(target_os = "windows") {
        Platform::Windows
    } else if cfg!(target_os = "macos") {
        Platform::MacOS
    } else if cfg!(target_os = "linux") {
        Platform::Linux
    } else {
        Platform::Unknown
    }
}

/// Detects the active display server.
///
/// On Linux: Wayland if `XDG_SESSION_TYPE=wayland` or `WAYLAND_DISPLAY` is
/// set; else X11 if `DISPLAY` is set; else `Unknown`.
pub fn detect_display_server(platform: Platform) -> DisplayServer {
    match platform {
        Platform::Windows => DisplayServer::Win32,
        Platform::MacOS => DisplayServer::Cocoa,
        Platform::Linux => detect_linux_display_server(),
        Platform::Unknown => DisplayServer::Unknown,
    }
}

fn detect_linux_display_server() -> DisplayServer {
    let session_type = std::env::var("XDG_SESSION_TYPE").unwrap_or_default();
    if session_type.eq_ignore_ascii_case("wayland") || std::env::var("WAYLAND_DISPLAY").is_ok() {
        DisplayServer::Wayland
    } else if std::env::var("DISPLAY").is_ok() {
        DisplayServer::X11
    } else {
        DisplayServer::Unknown
    }
}

/// Returns `true` when `bin` is found on `PATH`.
pub fn binary_on_path(bin: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| {
            std::env::split_paths(&paths).any(|dir| Path::new(&dir).join(bin).is_file())
        })
        .unwrap_or(false)
}

/// Distinguishes the Wayland compositor family. Only meaningful when
/// [`detect_display_server`] returned `DisplayServer::Wayland`.
pub fn detect_wayland_compositor() -> WaylandCompositor {
    if std::env::var("HYPRLAND_INSTANCE_SIGNATURE").is_ok() || binary_on_path("hyprctl") {
        WaylandCompositor::Hyprland
    } else if std::env::var("SWAYSOCK").is_ok() || binary_on_path("swaymsg") {
        WaylandCompositor::Sway
    } else {
        WaylandCompositor::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_platform_matches_build_target() {
        let platform = detect_platform();
        #[cfg(target_os = "linux")]
        assert_eq!(platform, Platform::Linux);
        #[cfg(target_os = "macos")]
        assert_eq!(platform, Platform::MacOS);
        #[cfg(target_os = "windows")]
        assert_eq!(platform, Platform::Windows);
    }

    #[test]
    fn test_detect_platform_is_idempotent() {
        assert_eq!(detect_platform(), detect_platform());
    }

    #[test]
    fn test_windows_display_server_is_win32() {
        assert_eq!(detect_display_server(Platform::Windows), DisplayServer::Win32);
    }

    #[test]
    fn test_macos_display_server_is_cocoa() {
        assert_eq!(detect_display_server(Platform::MacOS), DisplayServer::Cocoa);
    }

    #[test]
    fn test_unknown_platform_is_unknown_display_server() {
        assert_eq!(detect_display_server(Platform::Unknown), DisplayServer::Unknown);
    }
}
