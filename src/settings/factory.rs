//! Building a fully wired accessor from [`SettingsConfig`].

use super::accessor::Settings;
use crate::behaviors::{CacheBehavior, CacheOptions, ContextBehavior, QuickAccessBehavior};
use crate::cache::MemoryCache;
use crate::config::SettingsConfig;
use crate::errors::Result;
use crate::storage;
use std::sync::Arc;

/// An accessor plus the behaviors the configuration asked for.
#[derive(Debug, Clone)]
pub struct ConfiguredSettings {
    pub settings: Arc<Settings>,
    pub cache: Option<CacheBehavior>,
    pub quick_access: Option<QuickAccessBehavior>,
    pub contexts: Option<ContextBehavior>,
}

/// Validate `config`, create its storage backend and attach the configured
/// behaviors (cache, then quick access, then contexts).
pub async fn build_settings(config: &SettingsConfig) -> Result<ConfiguredSettings> {
    config.validate()?;

    let storage = storage::from_config(&config.storage).await?;
    let settings = Arc::new(
        Settings::builder()
            .storage(storage)
            .codec(config.codec.codec())
            .key_prefix(config.key_prefix.clone())
            .build_key(config.build_key)
            .build()?,
    );

    let cache = config.cache.enabled.then(|| {
        CacheBehavior::attach(
            &settings,
            Arc::new(MemoryCache::new()),
            CacheOptions {
                ttl: config.cache.ttl(),
                dependency: None,
                cache_absent: config.cache.cache_absent,
            },
        )
    });
    let quick_access = config.quick_access.then(|| QuickAccessBehavior::attach(settings.clone()));
    let contexts = config.contexts.then(|| ContextBehavior::attach(settings.clone()));

    tracing::info!(
        version = crate::VERSION,
        storage_type = %config.storage.storage_type(),
        codec = %config.codec,
        key_prefix = %config.key_prefix,
        cache = cache.is_some(),
        quick_access = quick_access.is_some(),
        contexts = contexts.is_some(),
        "Settings configured"
    );

    Ok(ConfiguredSettings { settings, cache, quick_access, contexts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseStorageConfig, StorageConfig};
    use crate::storage::StorageType;
    use serde_json::json;

    #[tokio::test]
    async fn test_build_default() {
        let configured = build_settings(&SettingsConfig::default()).await.unwrap();
        assert!(configured.cache.is_none());
        assert!(configured.quick_access.is_none());
        assert!(configured.contexts.is_none());
        assert_eq!(configured.settings.storage().storage_type(), StorageType::Memory);
    }

    #[tokio::test]
    async fn test_build_with_behaviors() {
        let config = SettingsConfig {
            key_prefix: "app_".to_string(),
            quick_access: true,
            contexts: true,
            storage: StorageConfig::Database(DatabaseStorageConfig {
                url: "sqlite::memory:".to_string(),
                ..Default::default()
            }),
            cache: crate::config::CacheConfig { enabled: true, ..Default::default() },
            ..Default::default()
        };

        let configured = build_settings(&config).await.unwrap();
        let settings = &configured.settings;
        assert_eq!(settings.key_prefix(), "app_");

        settings.set("mail", json!({"smtp": {"port": 25}})).await;
        assert_eq!(settings.get("mail.smtp.port").await.unwrap(), json!(25));
        assert_eq!(configured.cache.as_ref().map(|c| c.cache().len()), Some(1));

        let tenant = configured.contexts.as_ref().unwrap().context("tenant").unwrap();
        assert_eq!(tenant.get("mail.smtp.port").await.unwrap(), serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = SettingsConfig { key_prefix: "p".repeat(33), ..Default::default() };
        assert!(build_settings(&config).await.unwrap_err().is_configuration());
    }
}
