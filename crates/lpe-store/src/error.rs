//! Store and service errors.

use thiserror::Error;

use lpe_codec::DecodeError;
use lpe_core::{CanonicalizationError, CoreError, LicenseId, LicenseState};
use lpe_state::TransitionError;

/// Errors raised by a store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No record matches.
    #[error("license not found: {0}")]
    NotFound(String),

    /// The stored record changed since it was loaded.
    #[error("version conflict on license {id}: expected {expected}, found {actual}")]
    VersionConflict {
        /// License being saved.
        id: LicenseId,
        /// Version the caller loaded.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },

    /// Another license already uses this key.
    #[error("license key already in use: {0}")]
    DuplicateKey(String),

    /// The record fails its structural checks.
    #[error("invalid license record: {0}")]
    InvalidRecord(#[from] CoreError),
}

/// Errors surfaced by [`PolicyService`](crate::PolicyService).
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Store failure, including version conflicts.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Refused lifecycle command.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Rejected activation code.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Activation code could not be produced.
    #[error("activation code encoding failed: {0}")]
    Encode(#[from] CanonicalizationError),

    /// The license does not grant access in its current state.
    #[error("license {id} is {state} and cannot be used")]
    NotUsable {
        /// License asked for a use.
        id: LicenseId,
        /// State it was found in.
        state: LicenseState,
    },

    /// The usage ceiling is already met.
    #[error(transparent)]
    Usage(CoreError),
}
