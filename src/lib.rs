//! # kvsettings
//!
//! Key/value application settings over swappable storage backends, with an
//! extensible get/set/delete pipeline.
//!
//! ## Architecture
//!
//! ```text
//! caller → Settings (key builder, codec) → HookBus phases → Storage backend
//!                                             ↑
//!                     behaviors: cache, quick access, contexts
//! ```
//!
//! ## Core Components
//!
//! - **Storage**: memory, SQLite table, one file per key, generated TOML files, Vault KV v2
//! - **Key builder**: short keys verbatim, long and composite keys hashed, optional prefix
//! - **Codec**: CBOR+base64 by default, JSON or passthrough on request
//! - **Hook bus**: before/after handlers around every pipeline phase
//! - **Behaviors**: read-through cache, dot-path quick access, isolated contexts
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use kvsettings::{build_settings, Result, SettingsConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = SettingsConfig::from_env()?;
//!     let configured = build_settings(&config).await?;
//!
//!     configured.settings.set("site", json!({"title": "Example"})).await;
//!     let site = configured.settings.get_or("site", json!({})).await?;
//!     println!("{}", site);
//!     Ok(())
//! }
//! ```

pub mod behaviors;
pub mod cache;
pub mod codec;
pub mod config;
pub mod errors;
pub mod hooks;
pub mod key;
pub mod observability;
pub mod settings;
pub mod storage;

// Re-export commonly used types and traits
pub use behaviors::{CacheBehavior, CacheOptions, ContextBehavior, QuickAccessBehavior};
pub use cache::{Cache, CacheDependency, MemoryCache, TagDependency};
pub use codec::{Codec, CodecError};
pub use config::{SecretString, SettingsConfig, StorageConfig};
pub use errors::{Result, SettingsError};
pub use hooks::{Hook, HookBus, RawValue};
pub use key::{KeyBuilder, SettingKey};
pub use observability::init_logging;
pub use settings::{build_settings, ConfiguredSettings, Settings, SettingsBuilder};
pub use storage::{Storage, StorageType};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
