//! # Key Derivation
//!
//! Turns a caller-facing [`SettingKey`] into the storage key handed to a backend.
//!
//! Short string keys are used verbatim; long keys and composite keys are replaced
//! by a fixed-width digest so every storage key stays within the 64-byte column
//! limit (32 bytes of key + up to 32 bytes of prefix).

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// Raw keys longer than this many bytes are hashed.
pub const MAX_RAW_KEY_LEN: usize = 32;

/// Maximum accepted length of a key prefix.
pub const MAX_PREFIX_LEN: usize = 32;

/// Caller-facing identifier for a setting.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingKey {
    /// A plain string key, e.g. `"mail.smtp"`.
    Name(String),
    /// An ordered list of scalar components, only used to derive a storage key.
    Composite(Vec<Value>),
}

impl SettingKey {
    /// Returns the key as a string if it is a plain name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            SettingKey::Name(name) => Some(name),
            SettingKey::Composite(_) => None,
        }
    }

    /// Deterministic string form of the key. Composite keys are rendered as JSON.
    pub fn canonical(&self) -> String {
        match self {
            SettingKey::Name(name) => name.clone(),
            // Serializing a Vec<Value> cannot fail: every key is a string.
            SettingKey::Composite(parts) => {
                serde_json::to_string(parts).unwrap_or_else(|_| String::from("[]"))
            }
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl From<&str> for SettingKey {
    fn from(value: &str) -> Self {
        SettingKey::Name(value.to_string())
    }
}

impl From<String> for SettingKey {
    fn from(value: String) -> Self {
        SettingKey::Name(value)
    }
}

impl From<&String> for SettingKey {
    fn from(value: &String) -> Self {
        SettingKey::Name(value.clone())
    }
}

impl From<Vec<Value>> for SettingKey {
    fn from(value: Vec<Value>) -> Self {
        SettingKey::Composite(value)
    }
}

impl From<&[&str]> for SettingKey {
    fn from(value: &[&str]) -> Self {
        SettingKey::Composite(value.iter().map(|part| Value::from(*part)).collect())
    }
}

impl<const N: usize> From<[&str; N]> for SettingKey {
    fn from(value: [&str; N]) -> Self {
        SettingKey::Composite(value.iter().map(|part| Value::from(*part)).collect())
    }
}

/// Derives storage keys from logical keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyBuilder {
    prefix: String,
    hash_keys: bool,
}

impl KeyBuilder {
    /// Create a key builder. `hash_keys = false` uses raw keys (still prefixed).
    pub fn new(prefix: impl Into<String>, hash_keys: bool) -> Self {
        Self { prefix: prefix.into(), hash_keys }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = prefix.into();
    }

    pub fn hashes_keys(&self) -> bool {
        self.hash_keys
    }

    /// Build the storage key for `key`.
    pub fn build(&self, key: &SettingKey) -> String {
        let derived = if self.hash_keys {
            match key {
                SettingKey::Name(name) if name.len() <= MAX_RAW_KEY_LEN => name.clone(),
                SettingKey::Name(name) => digest(name),
                SettingKey::Composite(_) => digest(&key.canonical()),
            }
        } else {
            key.canonical()
        };

        format!("{}{}", self.prefix, derived)
    }
}

/// 32-character hex digest of `input` (first 128 bits of SHA-256).
pub fn digest(input: &str) -> String {
    let hash = Sha256::digest(input.as_bytes());
    hex::encode(&hash[..16])
}
