//! Dot-path access into composite settings.
//!
//! With quick access attached, `get("array.options.js")` reads the setting
//! `array` and returns its `options.js` element. The remainder path travels
//! with the event of that one call, so concurrent reads on a shared instance
//! never see each other's paths.

use super::path::{self, SEPARATOR};
use crate::errors::Result;
use crate::hooks::Hook;
use crate::key::SettingKey;
use crate::settings::Settings;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Quick-access handlers plus the `replace` operation.
#[derive(Debug, Clone)]
pub struct QuickAccessBehavior {
    owner: Arc<Settings>,
}

impl QuickAccessBehavior {
    /// Register the quick-access handlers on `owner`.
    ///
    /// The key rewrite is placed ahead of every before-get handler already
    /// registered, so caches look up the root key.
    pub fn attach(owner: Arc<Settings>) -> Self {
        owner.hooks().prepend(Hook::before_get(|event| {
            event.path = None;
            let split = event.origin.as_name().and_then(split_key).map(|(root, rest)| {
                (root.to_string(), rest.to_string())
            });
            if let Some((root, rest)) = split {
                event.rekey(SettingKey::Name(root));
                event.path = Some(rest);
            }
        }));

        owner.hooks().on(Hook::after_decode(|event| {
            let Some(path) = event.path.take() else {
                return;
            };
            match path::get_path(&event.value, &path).cloned() {
                Some(found) => event.value = found,
                None => event.value = event.take_default(),
            }
        }));

        Self { owner }
    }

    /// The same operations against another instance whose hooks already carry
    /// quick access, e.g. a context derived from the owner.
    pub fn with_owner(&self, owner: Arc<Settings>) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> &Arc<Settings> {
        &self.owner
    }

    /// Set `value` at `path` inside the composite stored under `key` and write
    /// the whole composite back.
    ///
    /// A missing setting starts as an empty mapping. A dotted `key` is split
    /// like in `get`: `replace("array.options", "img", v)` equals
    /// `replace("array", "options.img", v)`.
    pub async fn replace(&self, key: &str, path: &str, value: impl Into<Value>) -> Result<bool> {
        let (root, full_path) = match split_key(key) {
            Some((root, rest)) => (root, format!("{}{}{}", rest, SEPARATOR, path)),
            None => (key, path.to_string()),
        };

        let mut composite = self.owner.get_or(root, Value::Object(Map::new())).await?;
        path::set_path(&mut composite, &full_path, value.into());

        tracing::debug!(key = %root, path = %full_path, "Replacing setting element");
        Ok(self.owner.set(root, composite).await)
    }
}

/// Split `root.rest` at the first separator. `None` when either side is empty.
fn split_key(key: &str) -> Option<(&str, &str)> {
    key.split_once(SEPARATOR).filter(|(root, rest)| !root.is_empty() && !rest.is_empty())
}
