//! Event records passed through the hook bus.
//!
//! An event lives for exactly one pipeline phase. Handlers receive it by
//! mutable reference and may rewrite any public field; later handlers of the
//! same phase observe those changes.

use crate::key::{KeyBuilder, SettingKey};
use serde_json::Value;
use std::fmt;

/// Result of a raw storage lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// The backend holds this encoded value (possibly empty).
    Stored(String),
    /// The backend has nothing under the key.
    Missing,
}

impl RawValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, RawValue::Missing)
    }
}

impl From<Option<String>> for RawValue {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(raw) => RawValue::Stored(raw),
            None => RawValue::Missing,
        }
    }
}

/// Value returned by `get` when the key is absent or the path does not resolve.
pub enum DefaultValue {
    Value(Value),
    /// Computed only when it is actually needed.
    Deferred(Box<dyn FnOnce() -> Value + Send>),
}

impl DefaultValue {
    pub fn deferred<F>(producer: F) -> Self
    where
        F: FnOnce() -> Value + Send + 'static,
    {
        DefaultValue::Deferred(Box::new(producer))
    }

    pub fn resolve(self) -> Value {
        match self {
            DefaultValue::Value(value) => value,
            DefaultValue::Deferred(producer) => producer(),
        }
    }
}

impl Default for DefaultValue {
    fn default() -> Self {
        DefaultValue::Value(Value::Null)
    }
}

impl From<Value> for DefaultValue {
    fn from(value: Value) -> Self {
        DefaultValue::Value(value)
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
            DefaultValue::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

/// Before-get and after-get.
///
/// In before-get, `key` may be rewritten and setting `value` skips the
/// backend read. In after-get, `value` holds what the backend returned.
#[derive(Debug, Clone)]
pub struct GetEvent {
    /// Logical key as supplied by the caller.
    pub origin: SettingKey,
    /// Storage key used for the lookup.
    pub key: String,
    pub value: Option<RawValue>,
    /// Dot-path remainder to project after decoding. Carried to the paired [`DecodeEvent`].
    pub path: Option<String>,
    keys: KeyBuilder,
}

impl GetEvent {
    /// Event for `origin`, with the storage key derived by `keys`.
    pub fn new(origin: SettingKey, keys: &KeyBuilder) -> Self {
        let key = keys.build(&origin);
        Self { origin, key, value: None, path: None, keys: keys.clone() }
    }

    /// Replace the logical key and rebuild the storage key with the owning
    /// instance's key settings.
    pub fn rekey(&mut self, origin: SettingKey) {
        self.key = self.keys.build(&origin);
        self.origin = origin;
    }
}

/// After-decode: `value` is what `get` will return.
#[derive(Debug)]
pub struct DecodeEvent {
    pub key: String,
    pub value: Value,
    pub default: DefaultValue,
    pub path: Option<String>,
}

impl DecodeEvent {
    /// Take the default out of the event, leaving `null` behind.
    pub fn take_default(&mut self) -> Value {
        std::mem::take(&mut self.default).resolve()
    }
}

/// Before-set: logical key and the value before encoding.
#[derive(Debug, Clone)]
pub struct SetEvent {
    pub key: SettingKey,
    pub value: Value,
}

/// After-set: storage key, encoded value and the backend's answer.
#[derive(Debug, Clone)]
pub struct StoredEvent {
    pub key: String,
    pub value: String,
    pub written: bool,
}

/// Before-delete.
#[derive(Debug, Clone)]
pub struct DeleteEvent {
    pub key: SettingKey,
}

/// After-delete.
#[derive(Debug, Clone)]
pub struct DeletedEvent {
    pub key: String,
    pub deleted: bool,
}
