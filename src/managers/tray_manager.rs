//! System tray state and menu management.

use serde::{Deserialize, Serialize};

/// The current state of the system tray icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrayState {
    /// Paired and actively capturing.
    Paired,
    /// Not yet paired with a backend device.
    Unpaired,
    /// Paired but the last delivery attempt failed.
    Error,
}

impl Default for TrayState {
    fn default() -> Self {
        Self::Unpaired
    }
}

/// A menu item to be rendered in the system tray context menu.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrayMenuItem {
    /// Unique identifier for the menu item.
    pub id: String,
    /// Display label (empty string for separators).
    pub label: String,
    /// Whether the item is clickable.
    pub enabled: bool,
    /// For toggle items, whether it is currently checked.
    pub checked: Option<bool>,
}

impl TrayMenuItem {
    fn action(id: &str, label: &str) -> Self {
        Self { id: id.to_string(), label: label.to_string(), enabled: true, checked: None }
    }

    fn separator() -> Self {
        Self { id: "separator".to_string(), label: String::new(), enabled: false, checked: None }
    }
}

/// Manages system tray icon state and menu construction.
pub struct TrayManager {
    state: TrayState,
}

impl TrayManager {
    /// Creates a new `TrayManager` in the `Unpaired` state.
    pub fn new() -> Self {
        Self { state: TrayState::Unpaired }
    }

    /// Returns the current tray state.
    pub fn state(&self) -> TrayState {
        self.state
    }

    /// Sets the tray state.
    pub fn set_state(&mut self, state: TrayState) {
        self.state = state;
    }

    /// Builds the list of menu items for the tray context menu.
    pub fn build_menu_items(&self) -> Vec<TrayMenuItem> {
        vec![
            TrayMenuItem::action("open_pairing", "Open Pairing..."),
            TrayMenuItem::separator(),
            TrayMenuItem::action("status", self.tooltip_text().as_str()),
            TrayMenuItem::separator(),
            TrayMenuItem::action("quit", "Quit"),
        ]
    }

    /// Returns a tooltip string describing the current state.
    pub fn tooltip_text(&self) -> String {
        match self.state {
            TrayState::Paired => "Clepsy Agent - Capturing".to_string(),
            TrayState::Unpaired => "Clepsy Agent - Not Paired".to_string(),
            TrayState::Error => "Clepsy Agent - Delivery Error".to_string(),
        }
    }
}

impl Default for TrayManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_unpaired() {
        let mgr = TrayManager::new();
        assert_eq!(mgr.state(), TrayState::Unpaired);
    }

    #[test]
    fn test_set_state_paired() {
        let mut mgr = TrayManager::new();
        mgr.set_state(TrayState::Paired);
        assert_eq!(mgr.state(), TrayState::Paired);
    }

    #[test]
    fn test_set_state_error() {
        let mut mgr = TrayManager::new();
        mgr.set_state(TrayState::Error);
        assert_eq!(mgr.state(), TrayState::Error);
    }

    #[test]
    fn test_state_transitions_round_trip() {
        let mut mgr = TrayManager::new();
        mgr.set_state(TrayState::Paired);
        mgr.set_state(TrayState::Unpaired);
        assert_eq!(mgr.state(), TrayState::Unpaired);
    }

    #[test]
    fn test_menu_items_count() {
        let mgr = TrayManager::new();
        let items = mgr.build_menu_items();
        assert_eq!(items.len(), 5);
    }

    #[test]
    fn test_menu_items_first_is_open_pairing() {
        let mgr = TrayManager::new();
        let items = mgr.build_menu_items();
        assert_eq!(items[0].id, "open_pairing");
    }

    #[test]
    fn test_menu_last_is_quit() {
        let mgr = TrayManager::new();
        let items = mgr.build_menu_items();
        assert_eq!(items.last().unwrap().id, "quit");
    }

    #[test]
    fn test_tooltip_paired() {
        let mut mgr = TrayManager::new();
        mgr.set_state(TrayState::Paired);
        assert_eq!(mgr.tooltip_text(), "Clepsy Agent - Capturing");
    }

    #[test]
    fn test_tooltip_unpaired() {
        let mgr = TrayManager::new();
        assert_eq!(mgr.tooltip_text(), "Clepsy Agent - Not Paired");
    }

    #[test]
    fn test_tooltip_error() {
        let mut mgr = TrayManager::new();
        mgr.set_state(TrayState::Error);
        assert!(mgr.tooltip_text().contains("Error"));
    }

    #[test]
    fn test_tray_state_serialization() {
        let json = serde_json::to_string(&TrayState::Paired).unwrap();
        assert_eq!(json, "\"paired\"");
        let json = serde_json::to_string(&TrayState::Unpaired).unwrap();
        assert_eq!(json, "\"unpaired\"");
    }

    #[test]
    fn test_tray_state_deserialization() {
        let state: TrayState = serde_json::from_str("\"paired\"").unwrap();
        assert_eq!(state, TrayState::Paired);
    }

    #[test]
    fn test_tray_menu_item_serialization() {
        let item = TrayMenuItem::action("test", "Test");
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"id\":\"test\""));
        assert!(json.contains("\"label\":\"Test\""));
    }
}
