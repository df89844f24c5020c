mod common;

use std::sync::Arc;

use clepsy_agent_lib::config::{load_user_config, save_config, UserConfig};
use clepsy_agent_lib::managers::FileWatcher;
use clepsy_agent_lib::models::{AppHealth, Bbox, DeliveryStatus};
use clepsy_agent_lib::platform::window_info::active_window_likely_relevant;
use tokio::sync::RwLock;

use common::{paired_config, window_with_bbox};

#[test]
fn test_settings_round_trip_through_disk() {
    let (_tmp, dir) = common::create_temp_dir_path();
    let path = dir.join("settings.ini");

    let saved = save_config(&path, &paired_config()).unwrap();
    assert!(saved.is_paired());

    let reloaded = load_user_config(&path).unwrap();
    assert_eq!(reloaded, saved);
}

#[tokio::test]
async fn test_file_watcher_picks_up_external_pairing_write() {
    let (_tmp, dir) = common::create_temp_dir_path();
    let path = dir.join("settings.ini");

    let config = Arc::new(RwLock::new(UserConfig::default()));
    let mut watcher = FileWatcher::new(path.clone(), config.clone());
    watcher.prime().await;
    assert!(!config.read().await.is_paired());

    // Simulate the pairing UI (a separate process) writing the file.
    save_config(&path, &paired_config()).unwrap();
    watcher.prime().await;
    assert!(config.read().await.is_paired());
}

#[test]
fn test_relevance_filter_end_to_end_on_ultrawide_monitor() {
    // A narrow sidebar-sized window on a 3440x1440 ultrawide should still
    // clear the 10% area-ratio bar once its full height is considered.
    let monitor = Bbox::new(0, 0, 3440, 1440);
    let sidebar = window_with_bbox(Bbox::new(0, 0, 400, 1440));
    assert!(active_window_likely_relevant(&sidebar, &[monitor]));
}

#[test]
fn test_wlroots_clamp_matches_layout_union() {
    // Window spans off the left edge of a two-monitor layout; clamping
    // should crop it to the visible union rather than erroring.
    let layout = Bbox::new(-1920, 0, 3840, 1080);
    let window = Bbox::new(-2000, -10, 1200, 800);
    let clamped = window.clamp_to(&layout).unwrap();
    assert_eq!(clamped, Bbox::new(-1920, 0, 1120, 790));
}

#[tokio::test]
async fn test_app_health_tracks_independent_heartbeat_and_data_channels() {
    let health = Arc::new(RwLock::new(AppHealth::default()));
    health.write().await.record_heartbeat(DeliveryStatus::Success);
    health.write().await.record_data_sent(DeliveryStatus::Fail);

    let snapshot = health.read().await.clone();
    assert_eq!(snapshot.last_heartbeat_status, DeliveryStatus::Success);
    assert_eq!(snapshot.last_data_sent_status, DeliveryStatus::Fail);
}
