// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use inventory_scanner::{Config, ScanSettings};
use std::time::Duration;

fn temp_config_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir()
        .join(format!("scanner-config-{}-{}", name, std::process::id()))
        .join("config.json")
}

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.candidate_devices, vec![0, 1]);
    assert_eq!(config.failure_threshold, 30);
    assert!(config.show_scan_region, "Scan guide should be shown by default");
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_roundtrip_through_file() {
    let path = temp_config_path("roundtrip");
    let config = Config {
        candidate_devices: vec![2],
        failure_threshold: 5,
        mirror_preview: true,
        ..Config::default()
    };

    config.save_to(&path).unwrap();
    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn test_partial_config_uses_defaults() {
    // Older files without newer keys should still load
    let path = temp_config_path("partial");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, r#"{ "failure_threshold": 12 }"#).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded.failure_threshold, 12);
    assert_eq!(loaded.candidate_devices, Config::default().candidate_devices);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn test_invalid_config_falls_back_to_defaults() {
    let path = temp_config_path("invalid");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, r#"{ "candidate_devices": [] }"#).unwrap();

    assert!(Config::load_from(&path).is_err());
    assert_eq!(Config::load_or_default(&path), Config::default());

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn test_missing_config_file_gives_defaults() {
    let path = temp_config_path("missing");
    assert_eq!(Config::load_or_default(&path), Config::default());
}

#[test]
fn test_display_poll_interval_is_clamped() {
    let fast = Config {
        display_poll_ms: 1,
        ..Config::default()
    };
    let slow = Config {
        display_poll_ms: 5000,
        ..Config::default()
    };

    assert_eq!(fast.display_poll_interval(), Duration::from_millis(10));
    assert_eq!(slow.display_poll_interval(), Duration::from_millis(70));
}

#[test]
fn test_scan_settings_follow_config() {
    let config = Config {
        candidate_devices: vec![3, 4],
        failure_threshold: 8,
        restart_backoff_ms: 20,
        ..Config::default()
    };
    let settings = ScanSettings::from_config(&config);

    assert_eq!(settings.candidate_devices, vec![3, 4]);
    assert_eq!(settings.failure_threshold, 8);
    assert_eq!(settings.restart_backoff, Duration::from_millis(20));
}
