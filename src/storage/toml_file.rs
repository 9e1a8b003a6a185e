//! # Generated Value Files
//!
//! A [`FileStorage`] variant that writes each value as a small generated TOML
//! document and loads it back by parsing that document:
//!
//! ```toml
//! # Generated by kvsettings. Changes are picked up on the next read.
//! value = "..."
//! ```
//!
//! The files stay human-readable and hand-editable. A file that no longer
//! parses reads as "not found".

use super::backend::{Storage, StorageType};
use super::file::FileStorage;
use crate::config::FileStorageConfig;
use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default suffix for generated value files.
pub const DEFAULT_SUFFIX: &str = ".toml";

const HEADER: &str = "# Generated by kvsettings. Changes are picked up on the next read.\n";

#[derive(Debug, Serialize, Deserialize)]
struct GeneratedValue {
    value: String,
}

/// Generated TOML file backend.
#[derive(Debug, Clone)]
pub struct TomlFileStorage {
    files: FileStorage,
}

impl TomlFileStorage {
    pub fn new(config: &FileStorageConfig) -> Result<Self> {
        let suffix = config.suffix.as_deref().unwrap_or(DEFAULT_SUFFIX);
        Ok(Self { files: FileStorage::with_suffix(config, suffix)? })
    }

    pub fn files(&self) -> &FileStorage {
        &self.files
    }
}

/// Render the generated document for `value`.
fn render(value: &str) -> std::result::Result<String, toml::ser::Error> {
    let body = toml::to_string(&GeneratedValue { value: value.to_string() })?;
    Ok(format!("{}{}", HEADER, body))
}

#[async_trait]
impl Storage for TomlFileStorage {
    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let Some(source) = self.files.read_raw(key).await? else {
            return Ok(None);
        };

        match toml::from_str::<GeneratedValue>(&source) {
            Ok(generated) => Ok(Some(generated.value)),
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Generated settings file does not parse");
                Ok(None)
            }
        }
    }

    async fn set_value(&self, key: &str, value: &str) -> bool {
        match render(value) {
            Ok(document) => self.files.write_raw(key, document).await,
            Err(e) => {
                tracing::error!(error = %e, key = %key, "Unable to generate settings file");
                false
            }
        }
    }

    async fn delete_value(&self, key: &str) -> bool {
        self.files.delete_value(key).await
    }

    fn storage_type(&self) -> StorageType {
        StorageType::TomlFile
    }
}
