//! # Expiring Cache
//!
//! The cache used by [`crate::behaviors::CacheBehavior`]. Entries hold raw
//! encoded values (or the "not found" marker), an optional time to live and an
//! optional invalidation dependency.

use crate::hooks::RawValue;
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Invalidation source attached to cache entries.
///
/// An entry remembers the dependency's version when it is written and is
/// treated as a miss once the version moves on.
pub trait CacheDependency: Send + Sync + fmt::Debug {
    fn version(&self) -> u64;
}

/// Dependency invalidated by hand, e.g. when an external writer changes the backend.
#[derive(Debug, Default)]
pub struct TagDependency {
    version: AtomicU64,
}

impl TagDependency {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every entry written under this dependency stale.
    pub fn invalidate(&self) {
        self.version.fetch_add(1, Ordering::SeqCst);
    }
}

impl CacheDependency for TagDependency {
    fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }
}

/// Key/value cache with per-entry expiry.
///
/// Calls are synchronous: they run inside hook handlers.
pub trait Cache: Send + Sync + fmt::Debug {
    /// Cached value for `key`, `None` on a miss or an expired/stale entry.
    fn get(&self, key: &str) -> Option<RawValue>;

    fn set(
        &self,
        key: &str,
        value: RawValue,
        ttl: Option<Duration>,
        dependency: Option<Arc<dyn CacheDependency>>,
    );

    /// Returns `true` if an entry was removed.
    fn delete(&self, key: &str) -> bool;

    /// Drop every entry.
    fn flush(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
struct CacheEntry {
    value: RawValue,
    expires_at: Option<Instant>,
    dependency: Option<(Arc<dyn CacheDependency>, u64)>,
}

impl CacheEntry {
    fn is_fresh(&self) -> bool {
        let alive = self.expires_at.is_none_or(|at| Instant::now() < at);
        let current = self
            .dependency
            .as_ref()
            .is_none_or(|(dependency, version)| dependency.version() == *version);
        alive && current
    }
}

/// In-process cache over a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove expired and stale entries.
    pub fn cleanup_expired(&self) {
        self.entries.retain(|key, entry| {
            let fresh = entry.is_fresh();
            if !fresh {
                debug!(key = %key, "Removing expired cache entry");
            }
            fresh
        });
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<RawValue> {
        match self.entries.get(key) {
            Some(entry) if entry.is_fresh() => {
                debug!(key = %key, "Cache hit");
                return Some(entry.value.clone());
            }
            Some(_) => debug!(key = %key, "Cache entry expired"),
            None => {
                debug!(key = %key, "Cache miss");
                return None;
            }
        }

        // The read guard is released; drop the stale entry unless it was just rewritten.
        self.entries.remove_if(key, |_, entry| !entry.is_fresh());
        None
    }

    fn set(
        &self,
        key: &str,
        value: RawValue,
        ttl: Option<Duration>,
        dependency: Option<Arc<dyn CacheDependency>>,
    ) {
        debug!(key = %key, ttl_secs = ttl.map(|t| t.as_secs()), "Caching value");

        let entry = CacheEntry {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
            dependency: dependency.map(|dependency| {
                let version = dependency.version();
                (dependency, version)
            }),
        };
        self.entries.insert(key.to_string(), entry);
    }

    fn delete(&self, key: &str) -> bool {
        debug!(key = %key, "Invalidating cached value");
        self.entries.remove(key).is_some()
    }

    fn flush(&self) {
        debug!(entries = self.entries.len(), "Flushing cache");
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
