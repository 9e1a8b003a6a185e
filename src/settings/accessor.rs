//! # Settings Accessor
//!
//! The get/set/delete pipeline. Every operation derives the storage key, fires
//! the hooks of its phases and performs exactly one backend call (unless a
//! before-get handler already supplied the value).

use crate::codec::{Codec, CodecError};
use crate::config::validate_prefix;
use crate::errors::{Result, SettingsError};
use crate::hooks::{
    DecodeEvent, DefaultValue, DeleteEvent, DeletedEvent, Event, GetEvent, HookBus, RawValue,
    SetEvent, StoredEvent,
};
use crate::key::{KeyBuilder, SettingKey};
use crate::storage::Storage;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::Instrument;

/// Key/value settings over a pluggable storage backend.
///
/// ```rust,ignore
/// let settings = Settings::new(Arc::new(MemoryStorage::new()));
/// settings.set("site.title", json!("Example")).await;
/// let title = settings.get_or("site.title", json!("Untitled")).await?;
/// ```
#[derive(Debug)]
pub struct Settings {
    storage: Arc<dyn Storage>,
    codec: Codec,
    keys: KeyBuilder,
    hooks: HookBus,
}

/// Builder for [`Settings`]
#[derive(Debug)]
pub struct SettingsBuilder {
    storage: Option<Arc<dyn Storage>>,
    codec: Codec,
    key_prefix: String,
    build_key: bool,
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self { storage: None, codec: Codec::default(), key_prefix: String::new(), build_key: true }
    }
}

impl SettingsBuilder {
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Hash long and composite keys (default `true`).
    pub fn build_key(mut self, enabled: bool) -> Self {
        self.build_key = enabled;
        self
    }

    /// # Errors
    ///
    /// [`SettingsError::Config`] without a storage backend,
    /// [`SettingsError::Validation`] for an invalid prefix.
    pub fn build(self) -> Result<Settings> {
        let storage =
            self.storage.ok_or_else(|| SettingsError::config("A storage backend is required"))?;
        validate_prefix(&self.key_prefix)?;

        Ok(Settings {
            storage,
            codec: self.codec,
            keys: KeyBuilder::new(self.key_prefix, self.build_key),
            hooks: HookBus::new(),
        })
    }
}

impl Settings {
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Settings with the default codec, hashed keys and no prefix.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            codec: Codec::default(),
            keys: KeyBuilder::new("", true),
            hooks: HookBus::new(),
        }
    }

    /// Read a value, `null` if the key is absent.
    pub async fn get(&self, key: impl Into<SettingKey>) -> Result<Value> {
        self.fetch(key.into(), DefaultValue::default()).await
    }

    /// Read a value, `default` if the key is absent or undecodable.
    pub async fn get_or(
        &self,
        key: impl Into<SettingKey>,
        default: impl Into<Value>,
    ) -> Result<Value> {
        self.fetch(key.into(), DefaultValue::Value(default.into())).await
    }

    /// Read a value, computing the default only when it is needed.
    pub async fn get_or_else<F>(&self, key: impl Into<SettingKey>, default: F) -> Result<Value>
    where
        F: FnOnce() -> Value + Send + 'static,
    {
        self.fetch(key.into(), DefaultValue::deferred(default)).await
    }

    /// `true` if `get` would return something other than `null`.
    pub async fn exists(&self, key: impl Into<SettingKey>) -> Result<bool> {
        Ok(!self.get(key).await?.is_null())
    }

    /// Read a value into a typed structure. `None` if the key is absent.
    pub async fn get_as<T: DeserializeOwned>(
        &self,
        key: impl Into<SettingKey>,
    ) -> Result<Option<T>> {
        let key = key.into();
        let value = self.get(key.clone()).await?;
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value).map(Some).map_err(|e| SettingsError::Serialization {
            source: e,
            context: format!("Setting '{}' does not match the requested type", key),
        })
    }

    /// Store a value. Returns the backend's answer; failures are logged.
    pub async fn set(&self, key: impl Into<SettingKey>, value: impl Into<Value>) -> bool {
        let mut event = SetEvent { key: key.into(), value: value.into() };
        let span = crate::settings_span!("set", event.key);

        async move {
            self.hooks.trigger(Event::BeforeSet(&mut event));

            let storage_key = self.keys.build(&event.key);
            tracing::Span::current().record("storage_key", storage_key.as_str());

            let encoded = match self.codec.encode(&event.value) {
                Ok(encoded) => encoded,
                Err(e) => {
                    tracing::error!(error = %e, key = %event.key, "Unable to encode setting");
                    return false;
                }
            };

            let written = self.storage.set_value(&storage_key, &encoded).await;
            if !written {
                tracing::warn!(
                    key = %event.key,
                    storage_key = %storage_key,
                    "Setting was not written"
                );
            }

            let mut stored = StoredEvent { key: storage_key, value: encoded, written };
            self.hooks.trigger(Event::AfterSet(&mut stored));
            written
        }
        .instrument(span)
        .await
    }

    /// Store any serializable value.
    pub async fn set_as<T: Serialize + ?Sized>(
        &self,
        key: impl Into<SettingKey>,
        value: &T,
    ) -> Result<bool> {
        let key = key.into();
        let value = serde_json::to_value(value).map_err(|e| SettingsError::Serialization {
            source: e,
            context: format!("Setting '{}' cannot be represented as a value", key),
        })?;
        Ok(self.set(key, value).await)
    }

    /// Remove a value. `false` when nothing was deleted.
    pub async fn delete(&self, key: impl Into<SettingKey>) -> bool {
        let mut event = DeleteEvent { key: key.into() };
        let span = crate::settings_span!("delete", event.key);

        async move {
            self.hooks.trigger(Event::BeforeDelete(&mut event));

            let storage_key = self.keys.build(&event.key);
            tracing::Span::current().record("storage_key", storage_key.as_str());

            let deleted = self.storage.delete_value(&storage_key).await;

            let mut done = DeletedEvent { key: storage_key, deleted };
            self.hooks.trigger(Event::AfterDelete(&mut done));
            deleted
        }
        .instrument(span)
        .await
    }

    async fn fetch(&self, origin: SettingKey, default: DefaultValue) -> Result<Value> {
        let span = crate::settings_span!("get", origin);

        async move {
            let mut event = GetEvent::new(origin, &self.keys);
            self.hooks.trigger(Event::BeforeGet(&mut event));
            tracing::Span::current().record("storage_key", event.key.as_str());

            if event.value.is_none() {
                let raw = self.storage.get_value(&event.key).await?;
                event.value = Some(RawValue::from(raw));
                self.hooks.trigger(Event::AfterGet(&mut event));
            }

            let raw = match event.value.take() {
                Some(RawValue::Stored(raw)) => raw,
                _ => return Ok(default.resolve()),
            };

            let value = match self.codec.decode(&raw) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        key = %event.key,
                        "Stored setting is undecodable, using default"
                    );
                    return Ok(default.resolve());
                }
            };

            let mut decoded = DecodeEvent { key: event.key, value, default, path: event.path };
            self.hooks.trigger(Event::AfterDecode(&mut decoded));
            Ok(decoded.value)
        }
        .instrument(span)
        .await
    }

    /// Storage key `key` maps to.
    pub fn build_key(&self, key: impl Into<SettingKey>) -> String {
        self.keys.build(&key.into())
    }

    pub fn encode(&self, value: &Value) -> std::result::Result<String, CodecError> {
        self.codec.encode(value)
    }

    pub fn decode(&self, raw: &str) -> std::result::Result<Value, CodecError> {
        self.codec.decode(raw)
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn key_prefix(&self) -> &str {
        self.keys.prefix()
    }

    /// Change the prefix of every storage key built from now on.
    pub fn set_key_prefix(&mut self, prefix: impl Into<String>) -> Result<()> {
        let prefix = prefix.into();
        validate_prefix(&prefix)?;
        self.keys.set_prefix(prefix);
        Ok(())
    }

    pub fn hooks(&self) -> &HookBus {
        &self.hooks
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// A copy sharing storage and codec, with its own prefix and an
    /// independent snapshot of the registered hooks.
    pub fn fork(&self, prefix: impl Into<String>) -> Result<Settings> {
        let prefix = prefix.into();
        validate_prefix(&prefix)?;

        Ok(Settings {
            storage: Arc::clone(&self.storage),
            codec: self.codec.clone(),
            keys: KeyBuilder::new(prefix, self.keys.hashes_keys()),
            hooks: self.hooks.snapshot(),
        })
    }
}
