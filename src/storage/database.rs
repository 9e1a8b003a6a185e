//! # Database Storage
//!
//! Keeps one row per key in a two-column table:
//!
//! ```sql
//! CREATE TABLE settings (
//!     id   VARCHAR(64) NOT NULL PRIMARY KEY, -- 32 (key) + 32 (prefix)
//!     data TEXT
//! );
//! ```

use super::backend::{Storage, StorageType};
use crate::config::DatabaseStorageConfig;
use crate::errors::{Result, SettingsError};
use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Pool, Sqlite,
};
use std::{str::FromStr, time::Duration};
use tracing::Instrument;

/// Type alias for the database connection pool
pub type DbPool = Pool<Sqlite>;

/// Storage keys longer than this do not fit the `id` column.
pub const MAX_STORAGE_KEY_LEN: usize = 64;

const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a database connection pool with the specified configuration
pub async fn create_pool(config: &DatabaseStorageConfig) -> Result<DbPool> {
    if config.url.is_empty() {
        return Err(SettingsError::config("database URL cannot be empty"));
    }

    let in_memory = config.is_in_memory();

    let connect_options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| {
            SettingsError::database(e, format!("Invalid SQLite connection string: {}", config.url))
        })?
        .create_if_missing(true)
        .busy_timeout(SQLITE_BUSY_TIMEOUT);

    // An in-memory database lives exactly as long as its one connection.
    let (connect_options, pool_options) = if in_memory {
        (
            connect_options,
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None),
        )
    } else {
        (
            connect_options.journal_mode(SqliteJournalMode::Wal),
            SqlitePoolOptions::new().max_connections(config.max_connections),
        )
    };

    let pool = pool_options
        .acquire_timeout(config.connect_timeout())
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            tracing::error!(
                error = %e,
                url = %config.url,
                busy_timeout_ms = SQLITE_BUSY_TIMEOUT.as_millis(),
                "Failed to create SQLite database pool"
            );
            SettingsError::database(e, format!("Failed to connect to database: {}", config.url))
        })?;

    tracing::info!(
        in_memory,
        max_connections = if in_memory { 1 } else { config.max_connections },
        connect_timeout_ms = config.connect_timeout().as_millis(),
        "Database connection pool created"
    );

    Ok(pool)
}

/// Relational table backend.
#[derive(Debug, Clone)]
pub struct DbStorage {
    pool: DbPool,
    table: String,
}

impl DbStorage {
    /// Wrap an existing pool. Fails if `table` is not a plain SQL identifier.
    pub fn new(pool: DbPool, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self { pool, table })
    }

    /// Open a pool from configuration and, if requested, create the table.
    pub async fn connect(config: &DatabaseStorageConfig) -> Result<Self> {
        let pool = create_pool(config).await?;
        let storage = Self::new(pool, config.table.clone())?;
        if config.auto_create {
            storage.ensure_table().await?;
        }
        Ok(storage)
    }

    /// Create the settings table if it does not exist yet.
    pub async fn ensure_table(&self) -> Result<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (id VARCHAR(64) NOT NULL PRIMARY KEY, data TEXT)",
            self.table
        );
        sqlx::query(&sql).execute(&self.pool).await.map_err(|e| {
            tracing::error!(error = %e, table = %self.table, "Failed to create settings table");
            SettingsError::database(e, format!("Failed to create table '{}'", self.table))
        })?;

        tracing::info!(table = %self.table, "Settings table ready");
        Ok(())
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

#[async_trait]
impl Storage for DbStorage {
    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let sql = format!("SELECT data FROM {} WHERE id = ? LIMIT 1", self.table);
        let row: Option<(Option<String>,)> = sqlx::query_as(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .instrument(crate::storage_span!("select", key))
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    key = %key,
                    table = %self.table,
                    "Failed to read setting"
                );
                SettingsError::database(e, format!("Failed to read setting '{}'", key))
            })?;

        // A NULL `data` column reads as absent.
        Ok(row.and_then(|(data,)| data))
    }

    async fn set_value(&self, key: &str, value: &str) -> bool {
        if key.len() > MAX_STORAGE_KEY_LEN {
            tracing::warn!(
                key = %key,
                max_len = MAX_STORAGE_KEY_LEN,
                "Storage key does not fit the id column"
            );
            return false;
        }

        let sql = format!(
            "INSERT INTO {} (id, data) VALUES (?, ?) \
             ON CONFLICT(id) DO UPDATE SET data = excluded.data",
            self.table
        );
        match sqlx::query(&sql)
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .instrument(crate::storage_span!("upsert", key))
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    key = %key,
                    table = %self.table,
                    "Failed to write setting"
                );
                false
            }
        }
    }

    async fn delete_value(&self, key: &str) -> bool {
        let sql = format!("DELETE FROM {} WHERE id = ?", self.table);
        match sqlx::query(&sql)
            .bind(key)
            .execute(&self.pool)
            .instrument(crate::storage_span!("delete", key))
            .await
        {
            Ok(result) => result.rows_affected() > 0,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    key = %key,
                    table = %self.table,
                    "Failed to delete setting"
                );
                false
            }
        }
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Database
    }
}

fn validate_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid_start = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(SettingsError::validation_field(
            format!("'{}' is not a valid table name", table),
            "table",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> DatabaseStorageConfig {
        DatabaseStorageConfig { url: "sqlite::memory:".to_string(), ..Default::default() }
    }

    async fn storage() -> DbStorage {
        DbStorage::connect(&memory_config()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_then_update() {
        let storage = storage().await;
        assert_eq!(storage.get_value("key").await.unwrap(), None);

        assert!(storage.set_value("key", "one").await);
        assert_eq!(storage.get_value("key").await.unwrap(), Some("one".to_string()));

        assert!(storage.set_value("key", "two").await);
        assert_eq!(storage.get_value("key").await.unwrap(), Some("two".to_string()));
    }

    #[tokio::test]
    async fn test_empty_string_is_not_missing() {
        let storage = storage().await;
        assert!(storage.set_value("empty", "").await);
        assert_eq!(storage.get_value("empty").await.unwrap(), Some(String::new()));
    }

    #[tokio::test]
    async fn test_delete_reports_removal() {
        let storage = storage().await;
        assert!(!storage.delete_value("absent").await);
        storage.set_value("present", "x").await;
        assert!(storage.delete_value("present").await);
        assert_eq!(storage.get_value("present").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_oversized_key_is_refused() {
        let storage = storage().await;
        assert!(!storage.set_value(&"k".repeat(65), "x").await);
        assert!(storage.set_value(&"k".repeat(64), "x").await);
    }

    #[tokio::test]
    async fn test_missing_table_is_a_read_error() {
        let config = DatabaseStorageConfig { auto_create: false, ..memory_config() };
        let storage = DbStorage::connect(&config).await.unwrap();
        assert!(matches!(storage.get_value("k").await, Err(SettingsError::Database { .. })));
        assert!(!storage.set_value("k", "v").await);
    }

    #[test]
    fn test_table_name_validation() {
        assert!(validate_table_name("settings").is_ok());
        assert!(validate_table_name("_app_settings2").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("2fast").is_err());
        assert!(validate_table_name("settings; DROP TABLE users").is_err());
    }
}
