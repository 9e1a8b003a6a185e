//! # Error Handling
//!
//! This module provides error handling for the settings crate.
//! It defines custom error types using `thiserror`.

pub mod types;

pub use types::{Result, SettingsError};
