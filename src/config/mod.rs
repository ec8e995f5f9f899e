//! Configuration management
//!
//! This module handles the engine settings: where progress is stored,
//! stepper and toast timings, and the mining simulator's odds.

pub mod settings;

pub use settings::{Config, FileSettings, CONFIG_FILE, GLOBAL_CONFIG};
