// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use tempfile::TempDir;

#[test]
fn test_defaults() {
    let config = SyncConfig::default();
    assert_eq!(config.settle_delay_ms, 1_000);
    assert_eq!(config.max_retries, 3);
    assert!(config.auto_sync);
    assert!(config.cache_path.is_none());
    assert_eq!(config.settle_delay(), Duration::from_secs(1));
}

#[test]
fn test_parse_partial_file_uses_defaults() {
    let config = SyncConfig::parse("max_retries = 5\n").unwrap();
    assert_eq!(config.max_retries, 5);
    assert_eq!(config.settle_delay_ms, 1_000);
    assert!(config.auto_sync);
}

#[test]
fn test_parse_full_file() {
    let toml = r#"
settle_delay_ms = 250
max_retries = 1
auto_sync = false
cache_path = "state/cache.json"
"#;
    let config = SyncConfig::parse(toml).unwrap();
    assert_eq!(config.settle_delay_ms, 250);
    assert_eq!(config.max_retries, 1);
    assert!(!config.auto_sync);
    assert_eq!(config.cache_path.as_deref(), Some("state/cache.json"));
}

#[test]
fn test_parse_rejects_bad_toml() {
    let err = SyncConfig::parse("max_retries = \"lots\"").unwrap_err();
    assert!(matches!(err, SyncError::Config(_)));
}

#[test]
fn test_parse_rejects_huge_settle_delay() {
    let err = SyncConfig::parse("settle_delay_ms = 600000").unwrap_err();
    assert!(err.to_string().contains("settle_delay_ms"));
}

#[test]
fn test_config_load_missing_file() {
    let temp = TempDir::new().unwrap();
    assert!(SyncConfig::load(temp.path()).is_err());
    assert_eq!(SyncConfig::load_or_default(temp.path()).unwrap().max_retries, 3);
}

#[test]
fn test_config_save_and_reload() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("conf");
    let config = SyncConfig {
        settle_delay_ms: 10,
        max_retries: 7,
        auto_sync: true,
        cache_path: Some("cache.json".to_string()),
    };
    config.save(&dir).unwrap();

    let loaded = SyncConfig::load(&dir).unwrap();
    assert_eq!(loaded.settle_delay_ms, 10);
    assert_eq!(loaded.max_retries, 7);
    assert_eq!(loaded.cache_path.as_deref(), Some("cache.json"));
}

#[test]
fn test_cache_path_relative_and_absolute() {
    let dir = PathBuf::from("/project/.tally");

    let relative = SyncConfig { cache_path: Some("state.json".into()), ..Default::default() };
    assert_eq!(relative.cache_path(&dir), PathBuf::from("/project/.tally/state.json"));

    let absolute = SyncConfig { cache_path: Some("/var/tally.json".into()), ..Default::default() };
    assert_eq!(absolute.cache_path(&dir), PathBuf::from("/var/tally.json"));
}

#[test]
fn test_resolve_state_dir_order() {
    assert_eq!(
        resolve_state_dir(Some(PathBuf::from("/explicit")), Some(PathBuf::from("/xdg"))),
        PathBuf::from("/explicit")
    );
    assert_eq!(resolve_state_dir(None, Some(PathBuf::from("/xdg"))), PathBuf::from("/xdg/tally"));
    let fallback = resolve_state_dir(None, None);
    assert!(fallback.ends_with("tally") || fallback == PathBuf::from(".tally"));
}
