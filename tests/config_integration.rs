//! Integration tests for configuration management
//!
//! These tests validate that configuration is read from environment variables
//! and TOML files, and that `build_settings` wires the configured backend and
//! behaviors.

use kvsettings::config::CodecKind;
use kvsettings::{build_settings, Result, SettingsConfig, StorageConfig, StorageType};
use serde_json::json;
use std::env;
use std::sync::Mutex;
use tempfile::TempDir;
use tracing_test::traced_test;

// Use a mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const VARIABLES: &[&str] = &[
    "KVSETTINGS_STORAGE",
    "KVSETTINGS_CODEC",
    "KVSETTINGS_FILE_PATH",
    "KVSETTINGS_FILE_MODE",
    "KVSETTINGS_KEY_PREFIX",
    "KVSETTINGS_QUICK_ACCESS",
    "KVSETTINGS_CACHE",
    "KVSETTINGS_CACHE_TTL_SECONDS",
    "VAULT_ADDR",
    "VAULT_TOKEN",
];

/// Run `test` with `vars` set, restoring the previous environment afterwards.
fn with_env<T>(vars: &[(&str, &str)], test: impl FnOnce() -> T) -> T {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let saved: Vec<(&str, Option<String>)> =
        VARIABLES.iter().map(|name| (*name, env::var(name).ok())).collect();
    for name in VARIABLES {
        env::remove_var(name);
    }
    for (name, value) in vars {
        env::set_var(name, value);
    }

    let result = test();

    for (name, value) in saved {
        match value {
            Some(value) => env::set_var(name, value),
            None => env::remove_var(name),
        }
    }
    result
}

#[test]
fn test_config_defaults_integration() -> Result<()> {
    let config = with_env(&[], SettingsConfig::from_env)?;

    assert_eq!(config.storage.storage_type(), StorageType::Memory);
    assert_eq!(config.codec, CodecKind::Cbor);
    assert!(config.build_key);
    assert!(!config.cache.enabled);
    config.validate()
}

#[test]
fn test_config_environment_integration() -> Result<()> {
    let config = with_env(
        &[
            ("KVSETTINGS_STORAGE", "toml"),
            ("KVSETTINGS_CODEC", "raw"),
            ("KVSETTINGS_FILE_PATH", "/tmp/kvsettings-env"),
            ("KVSETTINGS_FILE_MODE", "600"),
            ("KVSETTINGS_KEY_PREFIX", "app_"),
            ("KVSETTINGS_QUICK_ACCESS", "true"),
            ("KVSETTINGS_CACHE", "true"),
            ("KVSETTINGS_CACHE_TTL_SECONDS", "30"),
        ],
        SettingsConfig::from_env,
    )?;

    assert_eq!(config.codec, CodecKind::Passthrough);
    assert_eq!(config.key_prefix, "app_");
    assert!(config.quick_access);
    assert_eq!(config.cache.ttl(), Some(std::time::Duration::from_secs(30)));
    match &config.storage {
        StorageConfig::TomlFile(file) => {
            assert_eq!(file.path, std::path::PathBuf::from("/tmp/kvsettings-env"));
            assert_eq!(file.file_mode, Some(0o600));
        }
        other => panic!("unexpected storage: {:?}", other),
    }
    config.validate()
}

#[test]
fn test_unknown_values_are_rejected() {
    let result = with_env(&[("KVSETTINGS_STORAGE", "redis")], SettingsConfig::from_env);
    assert!(result.unwrap_err().is_configuration());

    let result = with_env(&[("KVSETTINGS_CODEC", "yaml")], SettingsConfig::from_env);
    assert!(result.unwrap_err().is_configuration());
}

#[test]
fn test_vault_requires_token() {
    let config = with_env(
        &[("KVSETTINGS_STORAGE", "vault"), ("VAULT_ADDR", "http://vault.internal:8200")],
        SettingsConfig::from_env,
    )
    .unwrap();
    assert!(config.validate().is_err());

    let config = with_env(
        &[("KVSETTINGS_STORAGE", "vault"), ("VAULT_TOKEN", "s.token")],
        SettingsConfig::from_env,
    )
    .unwrap();
    assert!(config.validate().is_ok());
    assert!(!format!("{:?}", config).contains("s.token"));
}

#[traced_test]
#[tokio::test]
async fn test_build_from_toml_file() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("settings.toml");
    let data_path = dir.path().join("values");

    std::fs::write(
        &config_path,
        format!(
            r#"
key_prefix = "site_"
codec = "json"
quick_access = true

[storage]
type = "file"
path = "{}"

[cache]
enabled = true
"#,
            data_path.display()
        ),
    )
    .unwrap();

    let config = SettingsConfig::from_toml_file(&config_path).unwrap();
    let configured = build_settings(&config).await.unwrap();
    let settings = &configured.settings;

    assert!(settings.set("mail", json!({"smtp": {"port": 2525}})).await);
    assert_eq!(settings.get("mail.smtp.port").await.unwrap(), json!(2525));

    let written = std::fs::read_to_string(data_path.join("site_mail.bin")).unwrap();
    assert_eq!(written, r#"{"smtp":{"port":2525}}"#);
    assert!(configured.cache.is_some());
}

#[test]
fn test_missing_config_file() {
    let error = SettingsConfig::from_toml_file("/nonexistent/kvsettings.toml").unwrap_err();
    assert!(error.is_configuration());
}

#[test]
fn test_invalid_toml_config() {
    assert!(SettingsConfig::from_toml_str("codec = [").is_err());
    assert!(SettingsConfig::from_toml_str("codec = \"yaml\"").is_err());
}
