//! # Behaviors
//!
//! Cross-cutting features built purely from hook handlers plus helper
//! operations over `get`/`set`:
//!
//! - [`CacheBehavior`]: read-through/write-through cache of raw values
//! - [`QuickAccessBehavior`]: dot-path reads and `replace`
//! - [`ContextBehavior`]: isolated key spaces keyed by a discriminator
//!
//! Behaviors are attached explicitly and the returned value is used to call
//! their operations:
//!
//! ```rust,ignore
//! let settings = Arc::new(Settings::new(storage));
//! let cache =
//!     CacheBehavior::attach(&settings, Arc::new(MemoryCache::new()), CacheOptions::default());
//! let quick = QuickAccessBehavior::attach(settings.clone());
//! let contexts = ContextBehavior::attach(settings.clone());
//!
//! quick.replace("mail", "smtp.port", 587).await?;
//! let tenant = contexts.context("tenant-42")?;
//! ```

pub mod cache;
pub mod context;
pub mod path;
pub mod quick_access;

pub use cache::{CacheBehavior, CacheOptions};
pub use context::ContextBehavior;
pub use quick_access::QuickAccessBehavior;
