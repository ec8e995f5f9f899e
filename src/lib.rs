//! # Bitcoin Academy - course engine for an interactive Bitcoin course
//!
//! Everything behind the lessons except the rendering:
//!
//! ## What It Does
//! - **Curriculum**: ordered modules with prerequisites and an unlock resolver
//! - **Stepper**: the step machine every lesson uses, with timed auto-advance
//! - **Progress**: a pure reducer over completions, mastery points and achievement toasts
//! - **Storage**: Sled-backed learner progress and settings that survive restarts
//! - **Demos**: SHA-256 / hash256 helpers, a Merkle builder and prover, and a
//!   mining *simulator* (explicitly not proof-of-work)
//!
//! ## Layout
//! - `core/`: registry, stepper, progress, session, Merkle and mining demos
//! - `storage/`: the progress store
//! - `config/`: timings, data directory and simulator odds
//! - `utils/`: hashing and encoding helpers
//! - `cli/`: command-line interface

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod utils;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::{Config, GLOBAL_CONFIG};
pub use crate::core::{
    reduce, Achievement, CompletionSet, LearningSession, MerkleProof, MerkleTree, MiningSimulator,
    ModuleDescriptor, ModuleRegistry, ProgressAction, ProgressState, Stepper, ToastQueue,
};
pub use error::{AcademyError, Result};
pub use storage::{clamp_volume, AdaptationLevel, LearnerSettings, ProgressStore};
pub use utils::{
    base58check_decode, base58check_encode, double_sha256_hex, hash256, sha256, to_hex,
    truncate_hash, DISPLAY_HASH_LEN,
};
