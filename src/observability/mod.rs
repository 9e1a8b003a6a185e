//! # Observability
//!
//! Structured logging for the settings pipeline.

pub mod logging;

pub use logging::init_logging;
