//! Read-through / write-through caching of raw setting values.
//!
//! Entries are keyed by storage key and hold the encoded form, so decoding
//! and the after-decode hooks still run on every cache hit.

use crate::cache::{Cache, CacheDependency};
use crate::hooks::{Hook, RawValue};
use crate::settings::Settings;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Cache entry options.
#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    /// Entry lifetime, `None` for no expiry
    pub ttl: Option<Duration>,
    /// Invalidation dependency attached to every entry
    pub dependency: Option<Arc<dyn CacheDependency>>,
    /// Also cache "not found" results
    pub cache_absent: bool,
}

/// Cache handlers attached to a [`Settings`] instance.
#[derive(Debug, Clone)]
pub struct CacheBehavior {
    cache: Arc<dyn Cache>,
}

impl CacheBehavior {
    /// Register the cache handlers on `settings`.
    pub fn attach(settings: &Settings, cache: Arc<dyn Cache>, options: CacheOptions) -> Self {
        let hooks = settings.hooks();
        let CacheOptions { ttl, dependency, cache_absent } = options;

        let lookup = Arc::clone(&cache);
        hooks.on(Hook::before_get(move |event| {
            if event.value.is_none() {
                if let Some(hit) = lookup.get(&event.key) {
                    event.value = Some(hit);
                }
            }
        }));

        let fill = Arc::clone(&cache);
        let fill_dependency = dependency.clone();
        hooks.on(Hook::after_get(move |event| match &event.value {
            Some(RawValue::Missing) if !cache_absent => {
                debug!(key = %event.key, "Not caching absent setting");
            }
            Some(value) => fill.set(&event.key, value.clone(), ttl, fill_dependency.clone()),
            None => {}
        }));

        let store = Arc::clone(&cache);
        hooks.on(Hook::after_set(move |event| {
            if event.written {
                let raw = RawValue::Stored(event.value.clone());
                store.set(&event.key, raw, ttl, dependency.clone());
            }
        }));

        let evict = Arc::clone(&cache);
        hooks.on(Hook::after_delete(move |event| {
            evict.delete(&event.key);
        }));

        Self { cache }
    }

    /// Drop every cached entry.
    pub fn flush(&self) {
        self.cache.flush();
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryCache, TagDependency};
    use crate::storage::{MemoryStorage, Storage};
    use serde_json::{json, Value};

    fn cached(options: CacheOptions) -> (Arc<MemoryStorage>, Settings, CacheBehavior) {
        let storage = Arc::new(MemoryStorage::new());
        let settings = Settings::new(storage.clone());
        let behavior = CacheBehavior::attach(&settings, Arc::new(MemoryCache::new()), options);
        (storage, settings, behavior)
    }

    #[tokio::test]
    async fn test_set_populates_cache() {
        let (storage, settings, behavior) = cached(CacheOptions::default());

        assert!(settings.set("k", json!({"a": 1})).await);
        storage.clear();

        assert_eq!(settings.get("k").await.unwrap(), json!({"a": 1}));
        assert_eq!(storage.reads(), 0);

        behavior.flush();
        assert_eq!(settings.get("k").await.unwrap(), Value::Null);
        assert_eq!(storage.reads(), 1);
    }

    #[tokio::test]
    async fn test_read_populates_cache() {
        let (storage, settings, behavior) = cached(CacheOptions::default());
        storage.set_value("k", &settings.encode(&json!("v")).unwrap()).await;

        assert_eq!(settings.get("k").await.unwrap(), json!("v"));
        assert_eq!(settings.get("k").await.unwrap(), json!("v"));
        assert_eq!(storage.reads(), 1);
        assert_eq!(behavior.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_absent_keys_not_cached_by_default() {
        let (storage, settings, behavior) = cached(CacheOptions::default());

        assert_eq!(settings.get("absent").await.unwrap(), Value::Null);
        assert!(behavior.cache().is_empty());

        storage.set_value("absent", &settings.encode(&json!(1)).unwrap()).await;
        assert_eq!(settings.get("absent").await.unwrap(), json!(1));
    }

    #[tokio::test]
    async fn test_absent_keys_cached_when_enabled() {
        let (storage, settings, _) =
            cached(CacheOptions { cache_absent: true, ..Default::default() });

        assert_eq!(settings.get("absent").await.unwrap(), Value::Null);
        storage.set_value("absent", &settings.encode(&json!(1)).unwrap()).await;

        assert_eq!(settings.get_or("absent", "default").await.unwrap(), json!("default"));
        assert_eq!(storage.reads(), 1);
    }

    #[tokio::test]
    async fn test_delete_evicts() {
        let (_, settings, behavior) = cached(CacheOptions::default());
        settings.set("k", 1).await;
        assert_eq!(behavior.cache().len(), 1);

        assert!(settings.delete("k").await);
        assert!(behavior.cache().is_empty());
        assert_eq!(settings.get("k").await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_dependency_invalidation_forces_backend_read() {
        let tag = Arc::new(TagDependency::new());
        let (storage, settings, _) =
            cached(CacheOptions { dependency: Some(tag.clone()), ..Default::default() });

        settings.set("k", "old").await;
        storage.set_value("k", &settings.encode(&json!("new")).unwrap()).await;
        assert_eq!(settings.get("k").await.unwrap(), json!("old"));

        tag.invalidate();
        assert_eq!(settings.get("k").await.unwrap(), json!("new"));
    }
}
