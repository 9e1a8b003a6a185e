//! # Error Types
//!
//! Error types for the settings pipeline and its storage backends using `thiserror`.
//!
//! "Key not found" is never an error in this crate: absence surfaces as the
//! caller-supplied default. Errors are reserved for configuration failures at
//! construction time and for backend faults on the read path.

/// Custom result type for settings operations
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Main error type for the settings crate
#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    /// Configuration errors (missing storage, invalid table name, missing token)
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Database and storage errors
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    /// Remote secret backend errors
    #[error("Vault error: {message}")]
    Vault { message: String },

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl SettingsError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create a database error with context
    pub fn database<S: Into<String>>(source: sqlx::Error, context: S) -> Self {
        Self::Database { source, context: context.into() }
    }

    /// Create an I/O error with context
    pub fn io<S: Into<String>>(source: std::io::Error, context: S) -> Self {
        Self::Io { source, context: context.into() }
    }

    /// Create a remote secret backend error
    pub fn vault<S: Into<String>>(message: S) -> Self {
        Self::Vault { message: message.into() }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Whether this error was raised while building an instance rather than while using it
    pub fn is_configuration(&self) -> bool {
        matches!(self, SettingsError::Config { .. } | SettingsError::Validation { .. })
    }
}

// Error conversions for common external error types
impl From<sqlx::Error> for SettingsError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database { source: error, context: "Database operation failed".to_string() }
    }
}

impl From<std::io::Error> for SettingsError {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
    }
}

impl From<toml::de::Error> for SettingsError {
    fn from(error: toml::de::Error) -> Self {
        Self::config_with_source("TOML configuration could not be parsed", Box::new(error))
    }
}

impl From<validator::ValidationErrors> for SettingsError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::validation(format!("Validation failed: {}", message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = SettingsError::config("storage is required");
        assert!(matches!(error, SettingsError::Config { .. }));
        assert_eq!(error.to_string(), "Configuration error: storage is required");
        assert!(error.is_configuration());
    }

    #[test]
    fn test_validation_error() {
        let error = SettingsError::validation_field("too long", "key_prefix");
        assert!(matches!(error, SettingsError::Validation { .. }));
        if let SettingsError::Validation { field, .. } = error {
            assert_eq!(field, Some("key_prefix".to_string()));
        }
    }

    #[test]
    fn test_error_conversions() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error: SettingsError = io_error.into();
        assert!(matches!(error, SettingsError::Io { .. }));

        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let error: SettingsError = json_error.into();
        assert!(matches!(error, SettingsError::Serialization { .. }));

        let toml_error = toml::from_str::<toml::Value>("= nope").unwrap_err();
        let error: SettingsError = toml_error.into();
        assert!(error.is_configuration());
    }
}
