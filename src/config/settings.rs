//! # Configuration Settings
//!
//! Typed configuration for a settings accessor: key derivation, codec,
//! storage backend, attached behaviors and logging.

use super::secret::SecretString;
use crate::codec::Codec;
use crate::errors::{Result, SettingsError};
use crate::key::MAX_PREFIX_LEN;
use crate::storage::StorageType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SettingsConfig {
    /// Prepended to every storage key
    #[validate(length(max = 32, message = "Key prefix must be at most 32 bytes"))]
    pub key_prefix: String,

    /// Hash long and composite keys (disable to store raw keys)
    pub build_key: bool,

    pub codec: CodecKind,

    pub storage: StorageConfig,

    #[validate(nested)]
    pub cache: CacheConfig,

    /// Attach dot-path access
    pub quick_access: bool,

    /// Attach per-context key isolation
    pub contexts: bool,

    #[validate(nested)]
    pub logging: LoggingConfig,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            key_prefix: String::new(),
            build_key: true,
            codec: CodecKind::default(),
            storage: StorageConfig::default(),
            cache: CacheConfig::default(),
            quick_access: false,
            contexts: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl SettingsConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(SettingsError::from)?;
        self.validate_custom()
    }

    fn validate_custom(&self) -> Result<()> {
        validate_prefix(&self.key_prefix)?;

        match &self.storage {
            StorageConfig::Memory => {}
            StorageConfig::Database(db) => db.validate().map_err(SettingsError::from)?,
            StorageConfig::File(file) | StorageConfig::TomlFile(file) => {
                file.validate().map_err(SettingsError::from)?
            }
            StorageConfig::Vault(vault) => {
                vault.validate().map_err(SettingsError::from)?;
                if vault.token.as_ref().is_none_or(SecretString::is_empty) {
                    return Err(SettingsError::validation_field(
                        "Vault storage requires a token",
                        "storage.token",
                    ));
                }
            }
        }

        Ok(())
    }

    /// Load configuration from `KVSETTINGS_*` and `VAULT_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let flag = |name: &str, default: bool| {
            lookup(name).and_then(|s| s.parse::<bool>().ok()).unwrap_or(default)
        };

        let codec = match lookup("KVSETTINGS_CODEC") {
            Some(value) => value.parse::<CodecKind>().map_err(SettingsError::config)?,
            None => defaults.codec,
        };

        let storage_type = match lookup("KVSETTINGS_STORAGE") {
            Some(value) => value.parse::<StorageType>().map_err(SettingsError::config)?,
            None => StorageType::Memory,
        };

        let storage = match storage_type {
            StorageType::Memory => StorageConfig::Memory,
            StorageType::Database => {
                let db_defaults = DatabaseStorageConfig::default();
                StorageConfig::Database(DatabaseStorageConfig {
                    url: lookup("KVSETTINGS_DATABASE_URL").unwrap_or(db_defaults.url),
                    table: lookup("KVSETTINGS_DATABASE_TABLE").unwrap_or(db_defaults.table),
                    max_connections: lookup("KVSETTINGS_DATABASE_MAX_CONNECTIONS")
                        .and_then(|s| s.parse::<u32>().ok())
                        .unwrap_or(db_defaults.max_connections),
                    connect_timeout_seconds: lookup("KVSETTINGS_DATABASE_CONNECT_TIMEOUT_SECONDS")
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(db_defaults.connect_timeout_seconds),
                    auto_create: flag("KVSETTINGS_DATABASE_AUTO_CREATE", db_defaults.auto_create),
                })
            }
            StorageType::File | StorageType::TomlFile => {
                let file_defaults = FileStorageConfig::default();
                let file = FileStorageConfig {
                    path: lookup("KVSETTINGS_FILE_PATH")
                        .map(PathBuf::from)
                        .unwrap_or(file_defaults.path),
                    suffix: lookup("KVSETTINGS_FILE_SUFFIX"),
                    dir_mode: lookup("KVSETTINGS_FILE_DIR_MODE")
                        .and_then(|s| u32::from_str_radix(&s, 8).ok())
                        .unwrap_or(file_defaults.dir_mode),
                    file_mode: lookup("KVSETTINGS_FILE_MODE")
                        .and_then(|s| u32::from_str_radix(&s, 8).ok()),
                };
                if storage_type == StorageType::File {
                    StorageConfig::File(file)
                } else {
                    StorageConfig::TomlFile(file)
                }
            }
            StorageType::Vault => {
                let vault_defaults = VaultStorageConfig::default();
                StorageConfig::Vault(VaultStorageConfig {
                    address: lookup("VAULT_ADDR").unwrap_or(vault_defaults.address),
                    token: lookup("VAULT_TOKEN").map(SecretString::new),
                    namespace: lookup("VAULT_NAMESPACE"),
                    mount_path: lookup("VAULT_MOUNT_PATH").unwrap_or(vault_defaults.mount_path),
                    default_path: lookup("KVSETTINGS_VAULT_PATH")
                        .unwrap_or(vault_defaults.default_path),
                })
            }
        };

        let cache_defaults = CacheConfig::default();
        let cache = CacheConfig {
            enabled: flag("KVSETTINGS_CACHE", cache_defaults.enabled),
            ttl_seconds: lookup("KVSETTINGS_CACHE_TTL_SECONDS")
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(cache_defaults.ttl_seconds),
            cache_absent: flag("KVSETTINGS_CACHE_ABSENT", cache_defaults.cache_absent),
        };

        let logging_defaults = LoggingConfig::default();
        let logging = LoggingConfig {
            log_level: lookup("KVSETTINGS_LOG_LEVEL").unwrap_or(logging_defaults.log_level),
            json_logging: flag("KVSETTINGS_JSON_LOGGING", logging_defaults.json_logging),
        };

        Ok(Self {
            key_prefix: lookup("KVSETTINGS_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            build_key: flag("KVSETTINGS_BUILD_KEY", defaults.build_key),
            codec,
            storage,
            cache,
            quick_access: flag("KVSETTINGS_QUICK_ACCESS", defaults.quick_access),
            contexts: flag("KVSETTINGS_CONTEXTS", defaults.contexts),
            logging,
        })
    }

    /// Parse a TOML document. Missing fields take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::config_with_source(
                format!("Unable to read configuration file '{}'", path.display()),
                Box::new(e),
            )
        })?;
        Self::from_toml_str(&source)
    }
}

/// Check a key prefix: at most [`MAX_PREFIX_LEN`] bytes.
///
/// Quick access splits the caller's key before the prefix is applied, so a
/// prefix may contain the `.` separator.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.len() > MAX_PREFIX_LEN {
        return Err(SettingsError::validation_field(
            format!("Key prefix must be at most {} bytes", MAX_PREFIX_LEN),
            "key_prefix",
        ));
    }
    Ok(())
}

/// Codec selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecKind {
    #[default]
    Cbor,
    Json,
    Passthrough,
}

impl CodecKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cbor => "cbor",
            Self::Json => "json",
            Self::Passthrough => "passthrough",
        }
    }

    pub fn codec(&self) -> Codec {
        match self {
            Self::Cbor => Codec::Cbor,
            Self::Json => Codec::json(),
            Self::Passthrough => Codec::Passthrough,
        }
    }
}

impl FromStr for CodecKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "cbor" => Ok(Self::Cbor),
            "json" => Ok(Self::Json),
            "passthrough" | "raw" => Ok(Self::Passthrough),
            _ => Err(format!("Unknown codec: {}", s)),
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage backend selection, tagged by `type`.
///
/// ```toml
/// [storage]
/// type = "file"
/// path = "/var/lib/app/settings"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfig {
    #[default]
    Memory,
    Database(DatabaseStorageConfig),
    File(FileStorageConfig),
    TomlFile(FileStorageConfig),
    Vault(VaultStorageConfig),
}

impl StorageConfig {
    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::Memory => StorageType::Memory,
            Self::Database(_) => StorageType::Database,
            Self::File(_) => StorageType::File,
            Self::TomlFile(_) => StorageType::TomlFile,
            Self::Vault(_) => StorageType::Vault,
        }
    }
}

/// Database backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DatabaseStorageConfig {
    /// SQLite connection URL
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub url: String,

    /// Settings table name
    #[validate(length(min = 1, max = 64, message = "Table name must be 1 to 64 characters"))]
    pub table: String,

    #[validate(range(min = 1, max = 100, message = "Max connections must be between 1 and 100"))]
    pub max_connections: u32,

    #[validate(range(
        min = 1,
        max = 60,
        message = "Connect timeout must be between 1 and 60 seconds"
    ))]
    pub connect_timeout_seconds: u64,

    /// Create the table on connect
    pub auto_create: bool,
}

impl Default for DatabaseStorageConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/settings.db".to_string(),
            table: "settings".to_string(),
            max_connections: 5,
            connect_timeout_seconds: 10,
            auto_create: true,
        }
    }
}

impl DatabaseStorageConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

/// File and generated-file backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct FileStorageConfig {
    /// Directory holding one file per key
    pub path: PathBuf,

    /// File name suffix; the backend's own default when unset
    #[validate(length(max = 16, message = "Suffix must be at most 16 characters"))]
    pub suffix: Option<String>,

    /// Permissions applied to the directory
    #[validate(range(max = 0o7777, message = "Directory mode must be a permission mask"))]
    pub dir_mode: u32,

    /// Permissions applied to each written file
    #[validate(range(max = 0o7777, message = "File mode must be a permission mask"))]
    pub file_mode: Option<u32>,
}

impl Default for FileStorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/settings"),
            suffix: None,
            dir_mode: 0o755,
            file_mode: None,
        }
    }
}

/// Vault KV v2 backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct VaultStorageConfig {
    #[validate(length(min = 1, message = "Vault address cannot be empty"))]
    pub address: String,

    pub token: Option<SecretString>,

    pub namespace: Option<String>,

    /// KV v2 mount
    #[validate(length(min = 1, message = "Mount path cannot be empty"))]
    pub mount_path: String,

    /// Secret path used for keys without a `/`
    #[validate(length(min = 1, message = "Default path cannot be empty"))]
    pub default_path: String,
}

impl Default for VaultStorageConfig {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:8200".to_string(),
            token: None,
            namespace: None,
            mount_path: "secret".to_string(),
            default_path: "settings".to_string(),
        }
    }
}

/// Cache behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    /// Entry lifetime, 0 = until evicted
    #[validate(range(max = 604800, message = "Cache TTL cannot exceed one week"))]
    pub ttl_seconds: u64,

    /// Cache "not found" results too
    pub cache_absent: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: false, ttl_seconds: 0, cache_absent: false }
    }
}

impl CacheConfig {
    /// Entry lifetime, `None` if entries never expire.
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_seconds > 0).then(|| Duration::from_secs(self.ttl_seconds))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoggingConfig {
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    pub json_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logging: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config_validation() {
        let config = SettingsConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.build_key);
        assert_eq!(config.codec, CodecKind::Cbor);
        assert_eq!(config.storage.storage_type(), StorageType::Memory);
    }

    #[test]
    fn test_prefix_rules() {
        let mut config = SettingsConfig { key_prefix: "tenant_".to_string(), ..Default::default() };
        assert!(config.validate().is_ok());

        config.key_prefix = "app.".to_string();
        assert!(config.validate().is_ok());

        config.key_prefix = "a".repeat(33);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, SettingsError::Validation { .. }));
    }

    #[test]
    fn test_vault_requires_token() {
        let mut config = SettingsConfig {
            storage: StorageConfig::Vault(VaultStorageConfig::default()),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.storage = StorageConfig::Vault(VaultStorageConfig {
            token: Some(SecretString::new("hvs.token")),
            ..Default::default()
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_ranges() {
        let config = SettingsConfig {
            storage: StorageConfig::Database(DatabaseStorageConfig {
                max_connections: 0,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_str() {
        let config = SettingsConfig::from_toml_str(
            r#"
            key_prefix = "app_"
            codec = "json"
            quick_access = true

            [storage]
            type = "database"
            url = "sqlite::memory:"
            table = "app_settings"

            [cache]
            enabled = true
            ttl_seconds = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.key_prefix, "app_");
        assert_eq!(config.codec, CodecKind::Json);
        assert!(config.quick_access);
        assert!(config.build_key);
        assert_eq!(config.cache.ttl(), Some(Duration::from_secs(30)));
        match config.storage {
            StorageConfig::Database(db) => {
                assert!(db.is_in_memory());
                assert_eq!(db.table, "app_settings");
                assert_eq!(db.max_connections, 5);
            }
            other => panic!("unexpected storage {:?}", other),
        }
    }

    #[test]
    fn test_from_toml_str_rejects_unknown_storage() {
        let err = SettingsConfig::from_toml_str("[storage]\ntype = \"redis\"\n").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = SettingsConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.storage.storage_type(), StorageType::Memory);
        assert!(!config.cache.enabled);
        assert_eq!(config.logging.log_level, "info");
    }

    #[test]
    fn test_from_lookup_file_storage() {
        let config = SettingsConfig::from_lookup(lookup(&[
            ("KVSETTINGS_STORAGE", "toml"),
            ("KVSETTINGS_FILE_PATH", "/tmp/settings"),
            ("KVSETTINGS_FILE_MODE", "600"),
            ("KVSETTINGS_CODEC", "passthrough"),
            ("KVSETTINGS_CACHE", "true"),
        ]))
        .unwrap();

        assert_eq!(config.codec, CodecKind::Passthrough);
        assert!(config.cache.enabled);
        match config.storage {
            StorageConfig::TomlFile(file) => {
                assert_eq!(file.path, PathBuf::from("/tmp/settings"));
                assert_eq!(file.file_mode, Some(0o600));
                assert_eq!(file.dir_mode, 0o755);
            }
            other => panic!("unexpected storage {:?}", other),
        }
    }

    #[test]
    fn test_from_lookup_vault_storage() {
        let config = SettingsConfig::from_lookup(lookup(&[
            ("KVSETTINGS_STORAGE", "vault"),
            ("VAULT_ADDR", "https://vault.internal:8200"),
            ("VAULT_TOKEN", "hvs.env"),
        ]))
        .unwrap();

        match &config.storage {
            StorageConfig::Vault(vault) => {
                assert_eq!(vault.address, "https://vault.internal:8200");
                assert_eq!(vault.token.as_ref().map(|t| t.expose_secret()), Some("hvs.env"));
                assert_eq!(vault.mount_path, "secret");
            }
            other => panic!("unexpected storage {:?}", other),
        }
        assert!(!format!("{:?}", config).contains("hvs.env"));
    }

    #[test]
    fn test_from_lookup_rejects_unknown_codec() {
        let err = SettingsConfig::from_lookup(lookup(&[("KVSETTINGS_CODEC", "xml")])).unwrap_err();
        assert!(err.is_configuration());
    }
}
