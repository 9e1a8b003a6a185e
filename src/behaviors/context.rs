//! Isolated key spaces over one backend.
//!
//! `context(&discriminator)` returns an instance whose storage keys carry the
//! digest of the discriminator as prefix. Instances are created once per
//! discriminator and reused for the lifetime of the behavior; a new process
//! derives the same prefix, so nothing depends on the memo surviving.

use crate::errors::{Result, SettingsError};
use crate::key::digest;
use crate::settings::Settings;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;

/// Per-context instances derived from an owning [`Settings`].
#[derive(Debug, Clone)]
pub struct ContextBehavior {
    owner: Arc<Settings>,
    contexts: Arc<DashMap<String, Arc<Settings>>>,
}

impl ContextBehavior {
    /// Contexts copy the owner's hooks when they are first created, so attach
    /// cache and quick access to the owner before deriving contexts.
    pub fn attach(owner: Arc<Settings>) -> Self {
        Self { owner, contexts: Arc::new(DashMap::new()) }
    }

    /// The instance for `discriminator`, created on first use.
    ///
    /// Any serializable value works as discriminator: a tenant id, a
    /// `(user, locale)` tuple, a struct.
    pub fn context<D: Serialize + ?Sized>(&self, discriminator: &D) -> Result<Arc<Settings>> {
        let canonical =
            serde_json::to_string(discriminator).map_err(|e| SettingsError::Serialization {
                source: e,
                context: "Invalid context discriminator".to_string(),
            })?;
        let prefix = digest(&canonical);

        if let Some(existing) = self.contexts.get(&prefix) {
            return Ok(Arc::clone(existing.value()));
        }

        let forked = Arc::new(self.owner.fork(prefix.as_str())?);
        tracing::debug!(prefix = %prefix, "Created settings context");

        // A concurrent caller may have won the race; keep the first instance.
        let entry = self.contexts.entry(prefix).or_insert(forked);
        Ok(Arc::clone(entry.value()))
    }

    pub fn owner(&self) -> &Arc<Settings> {
        &self.owner
    }

    /// Number of contexts created so far.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
