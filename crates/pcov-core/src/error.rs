//! # Error Types
//!
//! Foundation-level errors. Domain crates define their own `thiserror`
//! enums (`GovernanceError`, `ClaimError`) and only wrap these when a
//! core operation fails underneath them.

use thiserror::Error;

/// Top-level error type for the foundation crate.
#[derive(Error, Debug)]
pub enum PcovError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A value failed constructor validation (identifier, timestamp, amount).
    #[error("validation error: {0}")]
    Validation(String),

    /// Engine configuration could not be parsed or is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// An in-memory balance could not cover the requested debit.
    #[error("account {account} holds {available}, cannot debit {requested}")]
    InsufficientBalance {
        /// The account being debited.
        account: String,
        /// Balance at the time of the request.
        available: String,
        /// Amount requested.
        requested: String,
    },

    /// Arithmetic on an amount would overflow.
    #[error("amount overflow: {0}")]
    Overflow(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations; use string or integer: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
