//! Tests for settings parsing and scan configuration

use sonar_history_core::config::{SETTINGS_FILE, DEFAULT_PROPERTIES};
use sonar_history_core::{read_allow_list, ConfigError, ScanConfig, Settings};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert!(settings
        .scanner
        .binary
        .to_string_lossy()
        .starts_with("sonar-scanner"));
    assert!(settings.scanner.args.is_empty());
    assert_eq!(settings.scanner.timeout(), None);
    assert_eq!(settings.scanner.properties, PathBuf::from(DEFAULT_PROPERTIES));
    assert_eq!(settings.log.file, PathBuf::from("sonar-history.log"));
}

#[test]
fn test_empty_toml_uses_defaults() {
    let settings: Settings = toml::from_str("").unwrap();
    assert_eq!(settings.scanner.properties, PathBuf::from("sonar.properties"));
    assert_eq!(settings.scanner.timeout_secs, 0);
}

#[test]
fn test_parse_settings() {
    let toml_str = r#"
[scanner]
binary = "/opt/sonar-scanner/bin/sonar-scanner"
args = ["-X", "-Dsonar.host.url=http://localhost:9000"]
timeout_secs = 900
properties = "config/base.properties"

[log]
file = "logs/history.log"
"#;

    let settings: Settings = toml::from_str(toml_str).unwrap();
    assert_eq!(
        settings.scanner.binary,
        PathBuf::from("/opt/sonar-scanner/bin/sonar-scanner")
    );
    assert_eq!(settings.scanner.args.len(), 2);
    assert_eq!(settings.scanner.timeout(), Some(Duration::from_secs(900)));
    assert_eq!(
        settings.scanner.properties,
        PathBuf::from("config/base.properties")
    );
    assert_eq!(settings.log.file, PathBuf::from("logs/history.log"));
}

#[test]
fn test_partial_section_keeps_other_defaults() {
    let settings: Settings = toml::from_str("[scanner]\ntimeout_secs = 60\n").unwrap();
    assert_eq!(settings.scanner.timeout(), Some(Duration::from_secs(60)));
    assert_eq!(settings.scanner.properties, PathBuf::from("sonar.properties"));
    assert_eq!(settings.log.file, PathBuf::from("sonar-history.log"));
}

#[test]
fn test_find_and_load_searches_ancestors() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(SETTINGS_FILE),
        "[scanner]\nbinary = \"my-scanner\"\n",
    )
    .unwrap();
    let nested = dir.path().join("a").join("b");
    std::fs::create_dir_all(&nested).unwrap();

    let settings = Settings::find_and_load(&nested).unwrap();
    assert_eq!(settings.scanner.binary, PathBuf::from("my-scanner"));
}

#[test]
fn test_invalid_settings_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(SETTINGS_FILE);
    std::fs::write(&path, "[scanner]\ntimeout_secs = \"soon\"\n").unwrap();

    assert!(matches!(
        Settings::from_file(&path),
        Err(ConfigError::SettingsParse { .. })
    ));
}

#[test]
fn test_missing_allow_list_is_config_error() {
    let dir = TempDir::new().unwrap();
    let err = read_allow_list(&dir.path().join("revisions.txt")).unwrap_err();
    assert!(matches!(err, ConfigError::AllowList { .. }));
}

#[test]
fn test_read_allow_list() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("revisions.txt");
    std::fs::write(&path, "8523f8cd\ne589d2a8\n\n1e5fd9f8\n").unwrap();

    let ids = read_allow_list(&path).unwrap();
    assert_eq!(ids.len(), 3);
    assert!(ids.contains("e589d2a8"));
}

#[test]
fn test_scan_config_defaults() {
    let config = ScanConfig::new("/repo");
    assert_eq!(config.stride, 1);
    assert_eq!(config.base_config, PathBuf::from("sonar.properties"));
    assert!(config.overrides.is_empty());
    assert!(config.validate().is_ok());
}
