//! # Structured Logging
//!
//! Span macros for the settings pipeline and storage backends, plus a
//! subscriber installer for binaries and tests that want console output.

use crate::config::LoggingConfig;
use crate::errors::{Result, SettingsError};
use tracing_subscriber::{fmt, EnvFilter};

/// Create a tracing span for a storage backend operation.
///
/// ```rust,ignore
/// let span = storage_span!("upsert", key);
/// let span = storage_span!("read", key, path = "settings/app");
/// ```
#[macro_export]
macro_rules! storage_span {
    ($operation:expr, $key:expr) => {
        tracing::debug_span!(
            "storage_operation",
            operation = %$operation,
            key = %$key
        )
    };
    ($operation:expr, $key:expr, $($field:tt)*) => {
        tracing::debug_span!(
            "storage_operation",
            operation = %$operation,
            key = %$key,
            $($field)*
        )
    };
}

/// Create a tracing span for one `get`, `set` or `delete` on a settings
/// accessor.
#[macro_export]
macro_rules! settings_span {
    ($operation:expr, $key:expr) => {
        tracing::debug_span!(
            "settings_operation",
            operation = %$operation,
            key = %$key,
            storage_key = tracing::field::Empty
        )
    };
    ($operation:expr, $key:expr, $($field:tt)*) => {
        tracing::debug_span!(
            "settings_operation",
            operation = %$operation,
            key = %$key,
            storage_key = tracing::field::Empty,
            $($field)*
        )
    };
}

/// Install a global fmt subscriber.
///
/// `RUST_LOG` wins over `config.log_level` when set. Fails if a global
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| {
            SettingsError::config_with_source(
                format!("Invalid log level '{}'", config.log_level),
                Box::new(e),
            )
        })?;

    let installed = if config.json_logging {
        fmt().with_env_filter(filter).json().try_init()
    } else {
        fmt().with_env_filter(filter).try_init()
    };

    installed.map_err(|e| SettingsError::config(format!("Logging already initialized: {}", e)))
}
