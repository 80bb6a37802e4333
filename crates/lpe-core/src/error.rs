//! # Error Types
//!
//! Errors raised by the foundational types. Evaluation outcomes such as
//! "indeterminate" or "no rule matched" are not errors and never appear
//! here; they are modelled as values by `lpe-rules`.

use thiserror::Error;

/// Top-level error type for `lpe-core`.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A timestamp string could not be parsed or was not UTC.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// An identifier string could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A license record violates one of its structural invariants.
    #[error("invalid license record: {0}")]
    InvalidRecord(String),

    /// Recording another use would exceed `max_uses`.
    #[error("usage limit reached ({current_uses} of {max_uses} uses consumed)")]
    UsageLimitReached {
        /// Uses consumed so far.
        current_uses: u64,
        /// Configured ceiling.
        max_uses: u64,
    },
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
