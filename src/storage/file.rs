//! # File Storage
//!
//! One file per key, named `<key><suffix>` inside a configured directory.
//! Reads take a shared advisory lock and writes an exclusive one, so concurrent
//! processes never observe a half-written value.

use super::backend::{Storage, StorageType};
use crate::config::FileStorageConfig;
use crate::errors::{Result, SettingsError};
use async_trait::async_trait;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Default suffix for settings files.
pub const DEFAULT_SUFFIX: &str = ".bin";

/// Filesystem backend.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
    suffix: String,
    file_mode: Option<u32>,
}

impl FileStorage {
    /// Create the storage, creating `config.path` (with `config.dir_mode`) if needed.
    pub fn new(config: &FileStorageConfig) -> Result<Self> {
        Self::with_suffix(config, config.suffix.as_deref().unwrap_or(DEFAULT_SUFFIX))
    }

    pub(crate) fn with_suffix(config: &FileStorageConfig, suffix: &str) -> Result<Self> {
        fs::create_dir_all(&config.path).map_err(|e| {
            SettingsError::config_with_source(
                format!("Unable to create settings directory '{}'", config.path.display()),
                Box::new(e),
            )
        })?;
        set_mode(&config.path, config.dir_mode);

        tracing::debug!(path = %config.path.display(), suffix = %suffix, "File storage ready");

        Ok(Self {
            dir: config.path.clone(),
            suffix: suffix.to_string(),
            file_mode: config.file_mode,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`, `None` if the key cannot be a file name.
    pub fn file_path(&self, key: &str) -> Option<PathBuf> {
        let unsafe_name = key.is_empty()
            || key.contains('/')
            || key.contains('\\')
            || key.contains("..")
            || key.contains('\0');
        if unsafe_name {
            return None;
        }
        Some(self.dir.join(format!("{}{}", key, self.suffix)))
    }

    /// Read the file contents for `key` under a shared lock.
    pub(crate) async fn read_raw(&self, key: &str) -> Result<Option<String>> {
        let Some(path) = self.file_path(key) else {
            tracing::warn!(key = %key, "Refusing to read setting with unsafe file name");
            return Ok(None);
        };

        let target = path.clone();
        tokio::task::spawn_blocking(move || read_locked(&target))
            .await
            .map_err(|e| SettingsError::internal(format!("file read task failed: {}", e)))?
            .map_err(|e| {
                tracing::warn!(error = %e, file = %path.display(), "Unable to read settings file");
                SettingsError::io(e, format!("Unable to read file '{}'", path.display()))
            })
    }

    /// Write `contents` for `key` under an exclusive lock.
    pub(crate) async fn write_raw(&self, key: &str, contents: String) -> bool {
        let Some(path) = self.file_path(key) else {
            tracing::warn!(key = %key, "Refusing to write setting with unsafe file name");
            return false;
        };

        let target = path.clone();
        let file_mode = self.file_mode;
        let result =
            tokio::task::spawn_blocking(move || write_locked(&target, &contents, file_mode))
                .await
                .map_err(io::Error::other)
                .and_then(|inner| inner);

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, file = %path.display(), "Unable to write settings file");
                false
            }
        }
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        self.read_raw(key).await
    }

    async fn set_value(&self, key: &str, value: &str) -> bool {
        self.write_raw(key, value.to_string()).await
    }

    async fn delete_value(&self, key: &str) -> bool {
        let Some(path) = self.file_path(key) else {
            return false;
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    file = %path.display(),
                    "Unable to delete settings file"
                );
                false
            }
        }
    }

    fn storage_type(&self) -> StorageType {
        StorageType::File
    }
}

fn read_locked(path: &Path) -> io::Result<Option<String>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    file.lock_shared()?;
    let mut contents = String::new();
    let read = file.read_to_string(&mut contents);
    file.unlock()?;
    read?;

    Ok(Some(contents))
}

fn write_locked(path: &Path, contents: &str, file_mode: Option<u32>) -> io::Result<()> {
    // Truncate only once the lock is held.
    let mut file = OpenOptions::new().write(true).create(true).truncate(false).open(path)?;
    file.lock()?;
    let written = file.set_len(0).and_then(|_| file.write_all(contents.as_bytes()));
    file.unlock()?;
    written?;

    if let Some(mode) = file_mode {
        set_mode(path, mode);
    }
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;

    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(mode)) {
        tracing::warn!(
            error = %e,
            path = %path.display(),
            mode = format!("{:o}", mode),
            "Unable to change permissions"
        );
    }
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) {}
