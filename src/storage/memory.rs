//! In-process storage backend.
//!
//! Useful for development and as the test double for the pipeline: tests can
//! inspect or wipe the raw contents directly to prove what did or did not
//! reach the backend.

use super::backend::{Storage, StorageType};
use crate::errors::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: DashMap<String, String>,
    reads: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw encoded value under `key`, bypassing the pipeline.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|entry| entry.value().clone())
    }

    /// Storage keys currently held, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drop every stored value.
    pub fn clear(&self) {
        self.values.clear();
    }

    /// Number of `get_value` calls served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.raw(key))
    }

    async fn set_value(&self, key: &str, value: &str) -> bool {
        self.values.insert(key.to_string(), value.to_string());
        true
    }

    async fn delete_value(&self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Memory
    }
}
