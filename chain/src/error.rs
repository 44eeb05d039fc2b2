//! Error types for the VolyaChain ledger.

use thiserror::Error;

/// Top-level error type for chain operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChainError {
    #[error("stake must be positive and keep total stake finite, got {stake}")]
    InvalidStake { stake: f64 },

    #[error("insufficient balance for {address}: available {have}, required {need}")]
    InsufficientBalance { address: String, have: f64, need: f64 },

    #[error("invalid {field}: {value} (must be finite and non-negative)")]
    InvalidAmount { field: &'static str, value: f64 },

    #[error("invalid chain parameters: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias using ChainError.
pub type Result<T> = std::result::Result<T, ChainError>;

/// The first integrity fault found while walking the chain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainFault {
    #[error("block {index}: previous hash {found} does not match preceding block hash {expected}")]
    BrokenLink {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("block {index}: stored hash {stored} does not match recomputed {computed}")]
    HashMismatch {
        index: usize,
        stored: String,
        computed: String,
    },

    #[error("block {index}: stored merkle root {stored} does not match transactions ({computed})")]
    MerkleMismatch {
        index: usize,
        stored: String,
        computed: String,
    },
}

impl ChainFault {
    /// Index of the offending block.
    pub fn index(&self) -> usize {
        match self {
            ChainFault::BrokenLink { index, .. }
            | ChainFault::HashMismatch { index, .. }
            | ChainFault::MerkleMismatch { index, .. } => *index,
        }
    }
}
