//! # Storage Backends
//!
//! Raw key/value persistence behind the settings pipeline. Every backend
//! implements [`Storage`] and only ever sees storage keys and encoded strings.

pub mod backend;
pub mod database;
pub mod file;
pub mod memory;
pub mod toml_file;
pub mod vault;

pub use backend::{Storage, StorageType};
pub use database::{create_pool, DbPool, DbStorage};
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use toml_file::TomlFileStorage;
pub use vault::VaultStorage;

use crate::config::StorageConfig;
use crate::errors::Result;
use std::sync::Arc;

/// Build the backend described by `config`.
///
/// Construction failures (unreachable database, missing Vault token,
/// uncreatable directory) are configuration errors.
pub async fn from_config(config: &StorageConfig) -> Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match config {
        StorageConfig::Memory => Arc::new(MemoryStorage::new()),
        StorageConfig::Database(db) => Arc::new(DbStorage::connect(db).await?),
        StorageConfig::File(file) => Arc::new(FileStorage::new(file)?),
        StorageConfig::TomlFile(file) => Arc::new(TomlFileStorage::new(file)?),
        StorageConfig::Vault(vault) => Arc::new(VaultStorage::new(vault)?),
    };

    tracing::debug!(storage_type = %storage.storage_type(), "Storage backend created");
    Ok(storage)
}
