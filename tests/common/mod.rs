//! Common test utilities for all integration tests.
//!
//! Provides settings instances over the in-memory backend and a wiremock-based
//! stand-in for a Vault KV v2 mount.

#![allow(dead_code)]

pub mod fake_vault;

use kvsettings::storage::MemoryStorage;
use kvsettings::{Codec, Settings};
use serde_json::{json, Value};
use std::sync::Arc;

/// Values every backend and codec has to round-trip.
pub fn sample_values() -> Vec<Value> {
    vec![
        json!({"options": {"css": ["bootstrap.css"], "js": ["jquery", "bootstrap.js"]}}),
        json!(["a", 1, true, null]),
        json!(42),
        json!(-7),
        json!(0),
        json!(1.5),
        json!("text"),
        json!(""),
        json!(true),
        json!(false),
        Value::Null,
    ]
}

/// Settings over a fresh memory backend, returning both.
pub fn memory_settings(codec: Codec) -> (Arc<MemoryStorage>, Settings) {
    let storage = Arc::new(MemoryStorage::new());
    let settings = Settings::builder()
        .storage(storage.clone())
        .codec(codec)
        .build()
        .expect("memory settings");
    (storage, settings)
}
