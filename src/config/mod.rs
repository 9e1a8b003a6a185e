//! # Configuration Management
//!
//! Configuration is read from environment variables or a TOML document and
//! turned into a ready-to-use accessor by [`crate::settings::build_settings`].

pub mod secret;
pub mod settings;

pub use secret::SecretString;
pub use settings::{
    validate_prefix, CacheConfig, CodecKind, DatabaseStorageConfig, FileStorageConfig,
    LoggingConfig, SettingsConfig, StorageConfig, VaultStorageConfig,
};
