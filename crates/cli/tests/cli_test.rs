//! Tests for the CLI helpers exposed through the library target

use pollwatch::{format_event, load_config, resolve_root};
use pollwatch_watcher::{FileEvent, FileOperation};
use pretty_assertions::assert_eq;
use std::time::{Duration, UNIX_EPOCH};
use tempfile::TempDir;

#[test]
fn test_load_config_from_file() {
    let temp_dir = TempDir::new().expect("test setup failed");
    let path = temp_dir.path().join("pollwatch.toml");
    std::fs::write(
        &path,
        "[watcher]\nscan_interval_ms = 1000\nignore_patterns = [\"*.bak\"]\n",
    )
    .expect("test setup failed");

    let config = load_config(Some(path.as_path())).expect("config should load");
    assert_eq!(config.watcher.scan_interval_ms, 1000);
    assert_eq!(config.watcher.notify_interval_ms, 250);
    assert_eq!(config.watcher.ignore_patterns, vec!["*.bak".to_string()]);
}

#[test]
fn test_load_config_rejects_invalid_values() {
    let temp_dir = TempDir::new().expect("test setup failed");
    let path = temp_dir.path().join("pollwatch.toml");
    std::fs::write(&path, "[watcher]\nnotify_interval_ms = 0\n").expect("test setup failed");

    assert!(load_config(Some(path.as_path())).is_err());
}

#[test]
fn test_format_event_text_and_json() {
    let event = FileEvent::new(
        FileOperation::Updated,
        "/proj/src/main.rs",
        UNIX_EPOCH + Duration::from_millis(1_500),
    );

    let text = format_event(&event, false).expect("formatting failed");
    assert!(text.starts_with("updated "));
    assert!(text.contains(" 1500 "));
    assert!(text.ends_with("/proj/src/main.rs"));

    let json = format_event(&event, true).expect("formatting failed");
    let value: serde_json::Value = serde_json::from_str(&json).expect("invalid json");
    assert_eq!(value["operation"], "updated");
    assert_eq!(value["path"], "/proj/src/main.rs");
}

#[test]
fn test_resolve_root_makes_paths_absolute() {
    let temp_dir = TempDir::new().expect("test setup failed");
    let resolved = resolve_root(temp_dir.path()).expect("resolution failed");
    assert!(resolved.is_absolute());

    let missing = resolve_root(std::path::Path::new("not/yet/created")).expect("resolution failed");
    assert!(missing.is_absolute());
    assert!(missing.ends_with("not/yet/created"));
}
