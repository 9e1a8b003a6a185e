//! # Hook Bus
//!
//! The single extension point of the settings pipeline. Behaviors (cache,
//! quick access, contexts) are nothing more than handlers registered here plus
//! helper operations layered over `get`/`set`.
//!
//! ```rust,ignore
//! use kvsettings::hooks::{Hook, RawValue};
//!
//! settings.hooks().on(Hook::before_get(|event| {
//!     if event.key == "feature.flags" {
//!         event.value = Some(RawValue::Stored(precomputed.clone()));
//!     }
//! }));
//! ```

pub mod bus;
pub mod events;

pub use bus::{Event, Hook, HookBus, Phase};
pub use events::{
    DecodeEvent, DefaultValue, DeleteEvent, DeletedEvent, GetEvent, RawValue, SetEvent,
    StoredEvent,
};
