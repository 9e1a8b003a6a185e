//! # Settings
//!
//! The accessor itself and the factory that wires it from configuration.

pub mod accessor;
pub mod factory;

pub use accessor::{Settings, SettingsBuilder};
pub use factory::{build_settings, ConfiguredSettings};
