//! # Vault Storage
//!
//! Stores settings as fields of HashiCorp Vault KV v2 secrets.
//!
//! A storage key is split on its last `/`: everything before it is the secret
//! path, the final segment is the field name. Keys without a `/` become fields
//! of the configured default secret:
//!
//! | storage key            | secret path     | field      |
//! |------------------------|-----------------|------------|
//! | `mail/smtp/password`   | `mail/smtp`     | `password` |
//! | `theme`                | `settings`      | `theme`    |
//!
//! Vault is treated as one opaque key/value collaborator: read, write, delete
//! and list of secrets. Tokens are never logged.

use super::backend::{Storage, StorageType};
use crate::config::VaultStorageConfig;
use crate::errors::{Result, SettingsError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::Instrument;
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultrs::kv2;

type SecretFields = HashMap<String, Value>;

/// Vault KV v2 backend.
pub struct VaultStorage {
    client: VaultClient,
    address: String,
    mount_path: String,
    default_path: String,
}

impl fmt::Debug for VaultStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultStorage")
            .field("address", &self.address)
            .field("mount_path", &self.mount_path)
            .field("default_path", &self.default_path)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl VaultStorage {
    /// Create a Vault client from configuration.
    ///
    /// # Errors
    ///
    /// [`SettingsError::Config`] if the address is empty, no token is
    /// configured, or the client cannot be built.
    pub fn new(config: &VaultStorageConfig) -> Result<Self> {
        if config.address.is_empty() {
            return Err(SettingsError::config("Vault address cannot be empty"));
        }

        let token = match &config.token {
            Some(token) if !token.is_empty() => token,
            _ => {
                return Err(SettingsError::config(
                    "Vault storage requires a token (set VAULT_TOKEN or storage.token)",
                ))
            }
        };

        let mut settings_builder = VaultClientSettingsBuilder::default();
        settings_builder.address(&config.address);
        settings_builder.token(token.expose_secret());

        if let Some(namespace) = &config.namespace {
            settings_builder.namespace(Some(namespace.clone()));
        }

        let settings = settings_builder.build().map_err(|e| {
            SettingsError::config(format!("Invalid Vault configuration: {}", e))
        })?;

        let client = VaultClient::new(settings).map_err(|e| {
            SettingsError::config(format!("Failed to create Vault client: {}", e))
        })?;

        tracing::info!(
            address = %config.address,
            mount_path = %config.mount_path,
            default_path = %config.default_path,
            "Vault storage configured"
        );

        Ok(Self {
            client,
            address: config.address.clone(),
            mount_path: config.mount_path.clone(),
            default_path: config.default_path.clone(),
        })
    }

    /// Secret path and field name for a storage key.
    pub fn locate<'a>(&'a self, key: &'a str) -> (&'a str, &'a str) {
        match key.rsplit_once('/') {
            Some((path, field)) if !path.is_empty() => (path, field),
            Some((_, field)) => (self.default_path.as_str(), field),
            None => (self.default_path.as_str(), key),
        }
    }

    /// Names stored directly below `path` (sub-paths end with `/`).
    pub async fn list_values(&self, path: &str) -> Result<Vec<String>> {
        match kv2::list(&self.client, &self.mount_path, path)
            .instrument(crate::storage_span!("list", path))
            .await
        {
            Ok(keys) => Ok(keys),
            Err(e) if is_not_found(&e) => Ok(Vec::new()),
            Err(e) => {
                tracing::error!(error = %e, path = %path, "Failed to list secrets in Vault");
                Err(SettingsError::vault(format!("Failed to list '{}': {}", path, e)))
            }
        }
    }

    async fn read_fields(
        &self,
        path: &str,
    ) -> std::result::Result<Option<SecretFields>, ClientError> {
        match kv2::read::<SecretFields>(&self.client, &self.mount_path, path).await {
            Ok(fields) => Ok(Some(fields)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Storage for VaultStorage {
    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let (path, field) = self.locate(key);

        let fields = self
            .read_fields(path)
            .instrument(crate::storage_span!("read", key, path = %path))
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    key = %key,
                    path = %path,
                    "Failed to read secret from Vault"
                );
                SettingsError::vault(format!("Failed to read '{}': {}", key, e))
            })?;

        Ok(fields.and_then(|mut fields| fields.remove(field)).map(|value| match value {
            Value::String(s) => s,
            other => other.to_string(),
        }))
    }

    async fn set_value(&self, key: &str, value: &str) -> bool {
        let (path, field) = self.locate(key);
        let span = crate::storage_span!("write", key, path = %path);

        async {
            // KV v2 writes replace the whole secret, so merge into what is there.
            let mut fields = match self.read_fields(path).await {
                Ok(fields) => fields.unwrap_or_default(),
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        key = %key,
                        path = %path,
                        "Failed to read secret before write"
                    );
                    return false;
                }
            };
            fields.insert(field.to_string(), Value::String(value.to_string()));

            match kv2::set(&self.client, &self.mount_path, path, &fields).await {
                Ok(_) => true,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        key = %key,
                        path = %path,
                        "Failed to write secret to Vault"
                    );
                    false
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn delete_value(&self, key: &str) -> bool {
        let (path, field) = self.locate(key);
        let span = crate::storage_span!("delete", key, path = %path);

        async {
            let mut fields = match self.read_fields(path).await {
                Ok(Some(fields)) => fields,
                Ok(None) => return false,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        key = %key,
                        path = %path,
                        "Failed to read secret before delete"
                    );
                    return false;
                }
            };

            if fields.remove(field).is_none() {
                return false;
            }

            let result = if fields.is_empty() {
                kv2::delete_metadata(&self.client, &self.mount_path, path).await
            } else {
                kv2::set(&self.client, &self.mount_path, path, &fields).await.map(|_| ())
            };

            match result {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        key = %key,
                        path = %path,
                        "Failed to delete secret field in Vault"
                    );
                    false
                }
            }
        }
        .instrument(span)
        .await
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Vault
    }
}

fn is_not_found(error: &ClientError) -> bool {
    matches!(error, ClientError::APIError { code: 404, .. })
}
