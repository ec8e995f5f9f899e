//! Error handling for the academy
//!
//! This module provides the error types for all course engine operations.

use std::fmt;

/// Result type alias for academy operations
pub type Result<T> = std::result::Result<T, AcademyError>;

/// Error types for academy operations
#[derive(Debug, Clone)]
pub enum AcademyError {
    /// Progress database errors
    Database(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// File I/O errors
    Io(String),
    /// Configuration errors
    Config(String),
    /// A module id that is not in the registry
    UnknownModule(String),
    /// A module whose prerequisites are not yet completed
    ModuleLocked { module: String, missing: Vec<String> },
    /// Step index outside the module's step range
    InvalidStep { step: usize, step_count: usize },
    /// Merkle tree construction or proof errors
    Merkle(String),
    /// Hex/Base58 decoding errors
    Encoding(String),
}

impl fmt::Display for AcademyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcademyError::Database(msg) => write!(f, "Database error: {msg}"),
            AcademyError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            AcademyError::Io(msg) => write!(f, "I/O error: {msg}"),
            AcademyError::Config(msg) => write!(f, "Configuration error: {msg}"),
            AcademyError::UnknownModule(id) => write!(f, "Unknown module: {id}"),
            AcademyError::ModuleLocked { module, missing } => {
                write!(
                    f,
                    "Module {module} is locked, complete first: {}",
                    missing.join(", ")
                )
            }
            AcademyError::InvalidStep { step, step_count } => {
                write!(f, "Invalid step {step}: module has {step_count} steps")
            }
            AcademyError::Merkle(msg) => write!(f, "Merkle error: {msg}"),
            AcademyError::Encoding(msg) => write!(f, "Encoding error: {msg}"),
        }
    }
}

impl std::error::Error for AcademyError {}

impl From<std::io::Error> for AcademyError {
    fn from(err: std::io::Error) -> Self {
        AcademyError::Io(err.to_string())
    }
}

impl From<sled::Error> for AcademyError {
    fn from(err: sled::Error) -> Self {
        AcademyError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for AcademyError {
    fn from(err: serde_json::Error) -> Self {
        AcademyError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for AcademyError {
    fn from(err: toml::de::Error) -> Self {
        AcademyError::Config(err.to_string())
    }
}
