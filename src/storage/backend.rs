//! Storage backend trait and types
//!
//! Defines the raw key/value contract every backend implements.

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type of storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    /// In-process map
    Memory,
    /// One row per key in a relational table
    Database,
    /// One file per key
    File,
    /// One generated TOML document per key
    TomlFile,
    /// HashiCorp Vault KV v2
    Vault,
}

impl StorageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Database => "database",
            Self::File => "file",
            Self::TomlFile => "toml_file",
            Self::Vault => "vault",
        }
    }
}

impl FromStr for StorageType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "memory" => Ok(Self::Memory),
            "database" | "db" => Ok(Self::Database),
            "file" => Ok(Self::File),
            "toml_file" | "toml" => Ok(Self::TomlFile),
            "vault" => Ok(Self::Vault),
            _ => Err(format!("Unknown storage type: {}", s)),
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait for storage backends
///
/// Backends only ever see storage keys (already prefixed and hashed) and
/// encoded string values.
///
/// Write and delete failures are logged by the backend and reported as
/// `false`; callers check the return value rather than handle an error.
/// Read failures other than "not found" are returned as errors.
#[async_trait]
pub trait Storage: Send + Sync + fmt::Debug {
    /// Fetch the encoded value stored under `key`, `None` if there is none.
    async fn get_value(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set_value(&self, key: &str, value: &str) -> bool;

    /// Remove `key`. Returns `false` when nothing was deleted.
    async fn delete_value(&self, key: &str) -> bool;

    /// Get the backend type identifier
    fn storage_type(&self) -> StorageType;
}
