//! # Value Codec
//!
//! Converts setting values to and from the string form that storage backends keep.
//!
//! Three strategies are available:
//! - [`Codec::Cbor`] (default): CBOR wrapped in standard base64, binary-safe for any value
//! - [`Codec::Custom`]: a caller-supplied encode/decode pair, e.g. [`Codec::json`]
//! - [`Codec::Passthrough`]: strings are stored as-is, other values as JSON text
//!
//! Passthrough reads back any stored text that parses as JSON as that JSON
//! value, so a string such as `"42"` or `"true"` comes back as a number or
//! bool. Store such strings with the default codec.
//!
//! Decoding never panics on corrupt data; it returns a [`CodecError`] that the
//! settings pipeline treats the same way as a missing key.

use base64::Engine;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Encode function used by [`Codec::Custom`].
pub type EncodeFn = Arc<dyn Fn(&Value) -> Result<String, CodecError> + Send + Sync>;

/// Decode function used by [`Codec::Custom`].
pub type DecodeFn = Arc<dyn Fn(&str) -> Result<Value, CodecError> + Send + Sync>;

/// Error produced when a value cannot be encoded or a stored string cannot be decoded.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("value could not be encoded: {0}")]
    Encode(String),

    #[error("stored value could not be decoded: {0}")]
    Undecodable(String),
}

/// Value encoding strategy.
#[derive(Clone, Default)]
pub enum Codec {
    #[default]
    Cbor,
    Custom {
        encode: EncodeFn,
        decode: DecodeFn,
    },
    Passthrough,
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Codec::Cbor => f.write_str("Codec::Cbor"),
            Codec::Custom { .. } => f.write_str("Codec::Custom"),
            Codec::Passthrough => f.write_str("Codec::Passthrough"),
        }
    }
}

impl Codec {
    /// Build a custom codec from an encode/decode pair.
    pub fn custom<E, D>(encode: E, decode: D) -> Self
    where
        E: Fn(&Value) -> Result<String, CodecError> + Send + Sync + 'static,
        D: Fn(&str) -> Result<Value, CodecError> + Send + Sync + 'static,
    {
        Codec::Custom { encode: Arc::new(encode), decode: Arc::new(decode) }
    }

    /// JSON text codec.
    pub fn json() -> Self {
        Self::custom(
            |value| serde_json::to_string(value).map_err(|e| CodecError::Encode(e.to_string())),
            |raw| serde_json::from_str(raw).map_err(|e| CodecError::Undecodable(e.to_string())),
        )
    }

    pub fn encode(&self, value: &Value) -> Result<String, CodecError> {
        match self {
            Codec::Cbor => {
                let mut buffer = Vec::new();
                ciborium::into_writer(value, &mut buffer)
                    .map_err(|e| CodecError::Encode(e.to_string()))?;
                Ok(base64::engine::general_purpose::STANDARD.encode(buffer))
            }
            Codec::Custom { encode, .. } => encode(value),
            Codec::Passthrough => Ok(match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            }),
        }
    }

    pub fn decode(&self, raw: &str) -> Result<Value, CodecError> {
        match self {
            Codec::Cbor => {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(raw)
                    .map_err(|e| CodecError::Undecodable(e.to_string()))?;
                ciborium::from_reader(bytes.as_slice())
                    .map_err(|e| CodecError::Undecodable(e.to_string()))
            }
            Codec::Custom { decode, .. } => decode(raw),
            Codec::Passthrough => {
                Ok(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
            }
        }
    }
}
