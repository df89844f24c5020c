//! Hyprland window-info provider: shells out to `hyprctl -j`.

use std::process::Command;
use std::thread;
use std::time::Duration;

use serde::Deserialize;

use crate::models::{Bbox, WindowInfo};

use super::{WindowInfoError, WindowInfoProvider};

const SUBPROCESS_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
struct HyprctlWindowAt {
    #[serde(rename = "at")]
    at: (i64, i64),
    size: (i64, i64),
    title: String,
    class: String,
    monitor: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct HyprctlMonitor {
    id: i64,
    name: String,
    x: i64,
    y: i64,
    width: i64,
    height: i64,
}

/// Reports the focused window via `hyprctl -j activewindow` / `monitors`.
pub struct HyprlandWindowInfoProvider;

impl HyprlandWindowInfoProvider {
    pub fn new() -> Self {
        Self
    }

    fn run_json(&self, args: &[&str]) -> Result<serde_json::Value, WindowInfoError> {
        let output = run_with_timeout("hyprctl", args, SUBPROCESS_TIMEOUT)?;
        serde_json::from_slice(&output).map_err(|e| WindowInfoError::Transient(e.to_string()))
    }

    fn query_once(&self) -> Result<Option<(WindowInfo, Vec<Bbox>)>, WindowInfoError> {
        let monitors_json = self.run_json(&["-j", "monitors"])?;
        let monitors: Vec<HyprctlMonitor> = serde_json::from_value(monitors_json.clone())
            .map_err(|e| WindowInfoError::Transient(e.to_string()))?;
        if monitors.is_empty() {
            return Err(WindowInfoError::Transient("hyprctl returned no monitors".into()));
        }
        let monitor_bboxes: Vec<Bbox> = monitors
            .iter()
            .map(|m| Bbox::new(m.x as i32, m.y as i32, m.width as i32, m.height as i32))
            .collect();

        let active_json = self.run_json(&["-j", "activewindow"])?;
        if active_json.is_null() || active_json.as_object().map(|o| o.is_empty()).unwrap_or(true) {
            return Ok(None);
        }
        let active: HyprctlWindowAt = serde_json::from_value(active_json)
            .map_err(|e| WindowInfoError::Transient(e.to_string()))?;

        let monitor = resolve_monitor(&monitors, &active.monitor)?;
        let bbox = Bbox::new(
            monitor.x as i32 + active.at.0 as i32,
            monitor.y as i32 + active.at.1 as i32,
            active.size.0 as i32,
            active.size.1 as i32,
        );

        let window = WindowInfo {
            title: active.title,
            app_name: active.class,
            bbox,
            monitor_names: vec![monitor.name.clone()],
        };
        Ok(Some((window, monitor_bboxes)))
    }
}

fn resolve_monitor<'a>(
    monitors: &'a [HyprctlMonitor],
    monitor_field: &serde_json::Value,
) -> Result<&'a HyprctlMonitor, WindowInfoError> {
    if let Some(name) = monitor_field.as_str() {
        return monitors
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| WindowInfoError::Transient(format!("unknown monitor name {name}")));
    }
    if let Some(idx) = monitor_field.as_i64() {
        return monitors
            .iter()
            .find(|m| m.id == idx)
            .or_else(|| monitors.get(idx as usize))
            .ok_or_else(|| WindowInfoError::Transient(format!("unknown monitor index {idx}")));
    }
    Err(WindowInfoError::Transient("unrecognized monitor field".into()))
}

fn run_with_timeout(bin: &str, args: &[&str], timeout: Duration) -> Result<Vec<u8>, WindowInfoError> {
    use std::sync::mpsc;
    let (tx, rx) = mpsc::channel();
    let bin = bin.to_string();
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    thread::spawn(move || {
        let result = Command::new(&bin).args(&args).output();
        let _ = tx.send(result);
    });
    match rx.recv_timeout(timeout) {
        Ok(Ok(output)) if output.status.success() => Ok(output.stdout),
        Ok(Ok(output)) => Err(WindowInfoError::Transient(format!(
            "{bin} exited with {:?}",
            output.status.code()
        ))),
        Ok(Err(e)) => Err(WindowInfoError::Transient(e.to_string())),
        Err(_) => Err(WindowInfoError::Transient(format!("{bin} timed out"))),
    }
}

impl Default for HyprlandWindowInfoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowInfoProvider for HyprlandWindowInfoProvider {
    fn active_window(
        &self,
        retries: u32,
        retry_cooldown: Duration,
    ) -> Result<(Option<WindowInfo>, Vec<Bbox>), WindowInfoError> {
        let mut attempt = 0;
        loop {
            match self.query_once() {
                Ok(Some((w, m))) => return Ok((Some(w), m)),
                Ok(None) => return Ok((None, Vec::new())),
                Err(e) if attempt < retries => {
                    tracing::debug!(error = %e, attempt, "hyprctl query failed, retrying");
                    attempt += 1;
                    thread::sleep(retry_cooldown);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_monitor_by_name() {
        let monitors = vec![
            HyprctlMonitor { id: 0, name: "DP-1".into(), x: 0, y: 0, width: 1920, height: 1080 },
            HyprctlMonitor { id: 1, name: "DP-2".into(), x: 1920, y: 0, width: 1920, height: 1080 },
        ];
        let field = serde_json::json!("DP-2");
        let resolved = resolve_monitor(&monitors, &field).unwrap();
        assert_eq!(resolved.name, "DP-2");
    }

    #[test]
    fn test_resolve_monitor_by_index() {
        let monitors = vec![
            HyprctlMonitor { id: 0, name: "DP-1".into(), x: 0, y: 0, width: 1920, height: 1080 },
        ];
        let field = serde_json::json!(0);
        let resolved = resolve_monitor(&monitors, &field).unwrap();
        assert_eq!(resolved.name, "DP-1");
    }

    #[test]
    fn test_resolve_monitor_unknown_name_errors() {
        let monitors = vec![HyprctlMonitor { id: 0, name: "DP-1".into(), x: 0, y: 0, width: 1920, height: 1080 }];
        let field = serde_json::json!("DP-9");
        assert!(resolve_monitor(&monitors, &field).is_err());
    }

    #[test]
    fn test_absolute_bbox_is_monitor_origin_plus_at() {
        let monitor = HyprctlMonitor { id: 1, name: "DP-2".into(), x: 1920, y: 0, width: 1920, height: 1080 };
        let at = (100i64, 50i64);
        let size = (800i64, 600i64);
        let bbox = Bbox::new(monitor.x as i32 + at.0 as i32, monitor.y as i32 + at.1 as i32, size.0 as i32, size.1 as i32);
        assert_eq!(bbox, Bbox::new(2020, 50, 800, 600));
    }
}
