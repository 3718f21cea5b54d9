//! Error types for powledger

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChainError {
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    /// A block whose index or `previous_hash` does not follow from its predecessor.
    #[error("Chain integrity violation at block {index}: {reason}")]
    ChainIntegrityViolation { index: u64, reason: String },

    #[error("No proof found for last proof {last_proof} after {attempts} attempts")]
    ProofNotFound { last_proof: u64, attempts: u64 },

    #[error("Invalid proof of work in block {index}")]
    InvalidProofOfWork { index: u64 },

    #[error("Mining task failed: {0}")]
    MiningTask(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl ChainError {
    /// Index of the block that broke the chain, if this error points at one.
    pub fn block_index(&self) -> Option<u64> {
        match self {
            ChainError::ChainIntegrityViolation { index, .. }
            | ChainError::InvalidProofOfWork { index } => Some(*index),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::Config(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
