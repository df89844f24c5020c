//! Sway window-info provider: shells out to `swaymsg -t`.

use std::process::Command;
use std::thread;
use std::time::Duration;

use serde::Deserialize;

use crate::models::{Bbox, WindowInfo};

use super::{WindowInfoError, WindowInfoProvider};

const SUBPROCESS_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize, Default)]
struct SwayRect {
    x: i64,
    y: i64,
    width: i64,
    height: i64,
}

#[derive(Debug, Deserialize, Default)]
struct SwayNode {
    #[serde(default)]
    focused: bool,
    #[serde(default)]
    rect: Option<SwayRect>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    app_id: Option<String>,
    #[serde(default)]
    window_properties: Option<SwayWindowProperties>,
    #[serde(default)]
    nodes: Vec<SwayNode>,
    #[serde(default)]
    floating_nodes: Vec<SwayNode>,
}

#[derive(Debug, Deserialize, Default)]
struct SwayWindowProperties {
    class: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SwayOutput {
    name: String,
    rect: SwayRect,
    active: bool,
}

/// Reports the focused window via `swaymsg -t get_tree` / `get_outputs`.
pub struct SwayWindowInfoProvider;

impl SwayWindowInfoProvider {
    pub fn new() -> Self {
        Self
    }

    fn query_once(&self) -> Result<Option<(WindowInfo, Vec<Bbox>)>, WindowInfoError> {
        let tree_bytes = run_with_timeout("swaymsg", &["-t", "get_tree"], SUBPROCESS_TIMEOUT)?;
        let tree: SwayNode =
            serde_json::from_slice(&tree_bytes).map_err(|e| WindowInfoError::Transient(e.to_string()))?;

        let outputs_bytes = run_with_timeout("swaymsg", &["-t", "get_outputs"], SUBPROCESS_TIMEOUT)?;
        let outputs: Vec<SwayOutput> =
            serde_json::from_slice(&outputs_bytes).map_err(|e| WindowInfoError::Transient(e.to_string()))?;
        if outputs.is_empty() {
            return Err(WindowInfoError::Transient("swaymsg returned no outputs".into()));
        }
        let monitor_bboxes: Vec<Bbox> = outputs
            .iter()
            .filter(|o| o.active)
            .map(|o| Bbox::new(o.rect.x as i32, o.rect.y as i32, o.rect.width as i32, o.rect.height as i32))
            .collect();

        let Some(focused) = find_focused(&tree) else {
            return Ok(None);
        };
        let Some(rect) = &focused.rect else {
            return Ok(None);
        };
        let bbox = Bbox::new(rect.x as i32, rect.y as i32, rect.width as i32, rect.height as i32);
        let center_x = bbox.left + bbox.width / 2;
        let center_y = bbox.top + bbox.height / 2;
        let monitor_name = outputs
            .iter()
            .find(|o| {
                let r = Bbox::new(o.rect.x as i32, o.rect.y as i32, o.rect.width as i32, o.rect.height as i32);
                center_x >= r.left && center_x < r.right() && center_y >= r.top && center_y < r.bottom()
            })
            .map(|o| o.name.clone());

        let app_name = focused
            .app_id
            .clone()
            .or_else(|| focused.window_properties.as_ref().and_then(|p| p.class.clone()))
            .unwrap_or_else(|| "unknown".to_string());

        let window = WindowInfo {
            title: focused.name.clone().unwrap_or_default(),
            app_name,
            bbox,
            monitor_names: monitor_name.into_iter().collect(),
        };
        Ok(Some((window, monitor_bboxes)))
    }
}

/// Recursively walks `nodes`/`floating_nodes` looking for the focused leaf
/// with a non-null rect.
fn find_focused(node: &SwayNode) -> Option<&SwayNode> {
    if node.focused && node.rect.is_some() {
        return Some(node);
    }
    for child in node.nodes.iter().chain(node.floating_nodes.iter()) {
        if let Some(found) = find_focused(child) {
            return Some(found);
        }
    }
    None
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

impl Default for SwayWindowInfoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowInfoProvider for SwayWindowInfoProvider {
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
                    tracing::debug!(error = %e, attempt, "swaymsg query failed, retrying");
                    attempt += 1;
                    thread::sleep(retry_cooldown);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
