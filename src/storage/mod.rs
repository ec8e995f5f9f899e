//! Data storage and persistence
//!
//! Learner progress and settings are kept in an embedded Sled database
//! so a course can be resumed across sessions.

pub mod progress_store;

pub use progress_store::{clamp_volume, AdaptationLevel, LearnerSettings, ProgressStore};
