//! Error taxonomy for the audit ledger.
//!
//! Every fallible operation in the ledger returns `LedgerResult<T>`.  A chain
//! integrity breach is deliberately absent from this enum: it is a normal
//! verification outcome (`ChainVerificationReport::ok == false`), not an error.

use thiserror::Error;

/// The unified error type for the bioledger crates.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The persistent store failed to read or write.
    ///
    /// A regulated action whose append fails with this error is not recorded
    /// and must not be treated as complete.
    #[error("storage failure: {reason}")]
    Storage { reason: String },

    /// A value could not be canonicalized for hashing.
    #[error("canonicalization failed: {reason}")]
    Canonicalization { reason: String },

    /// The stored ledger could not be decoded.
    #[error("stored ledger is corrupt: {reason}")]
    CorruptLog { reason: String },

    /// Another writer kept moving the tail and the bounded retry budget ran out.
    #[error("append conflict: tail changed on each of {attempts} attempts")]
    AppendConflict { attempts: u32 },

    /// No record with the given id exists in the ledger.
    #[error("record not found: {record_id}")]
    RecordNotFound { record_id: String },

    /// The record already carries an electronic signature.
    #[error("record already signed: {record_id}")]
    AlreadySigned { record_id: String },

    /// The signature was computed over a different data checksum than the record's.
    #[error("signature does not cover record {record_id}: {reason}")]
    SignatureMismatch { record_id: String, reason: String },

    /// The signature is already attached to another record.
    #[error("signature {signature_hash} is already attached to record {record_id}")]
    SignatureReused {
        signature_hash: String,
        record_id: String,
    },

    /// A required signing field is missing or empty.
    #[error("signature precondition failed: {reason}")]
    SignaturePrecondition { reason: String },

    /// The meaning is not in the allowed list for the action type.
    #[error("meaning '{meaning}' is not allowed for {action_type} sign-off")]
    MeaningNotAllowed {
        meaning: String,
        action_type: String,
    },

    /// No valid re-authentication token was presented.
    #[error("re-authentication required: {reason}")]
    ReAuthRequired { reason: String },

    /// The authenticator rejected the presented credential.
    #[error("authentication failed for signer '{signer_id}'")]
    AuthenticationFailed { signer_id: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// Writing an export failed.
    #[error("export failed: {reason}")]
    Export { reason: String },

    /// The system is locked after an integrity breach; mutations are refused.
    #[error("system locked: {reason}")]
    SystemLocked { reason: String },
}

/// Convenience alias used throughout the bioledger crates.
pub type LedgerResult<T> = Result<T, LedgerError>;
