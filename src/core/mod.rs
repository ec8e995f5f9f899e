//! Core course engine
//!
//! This module contains the curriculum registry and unlock resolver, the
//! step machine every lesson shares, progress tracking, and the Merkle and
//! mining demos the lessons drive.

pub mod merkle;
pub mod mining;
pub mod progress;
pub mod registry;
pub mod session;
pub mod stepper;

pub use merkle::{MerkleNode, MerkleProof, MerkleTree, ProofElement, SiblingPosition};
pub use mining::{MiningSimulator, MiningTick, SimulatedBlock, MAX_ATTEMPTS_PER_TICK};
pub use progress::{reduce, Achievement, ProgressAction, ProgressState, ToastQueue};
pub use registry::{CompletionSet, ModuleDescriptor, ModuleRegistry, ModuleStatus, RegistryIssue};
pub use session::{LearningSession, PollReport, StepReport};
pub use stepper::{StepOutcome, Stepper};
