//! Hash-chain primitives.
//!
//! Chain checksum input layout (chain version 1, bytes in order):
//!   1. canonical JSON of the record without `checksum` and `signature`
//!   2. `prev_checksum` as UTF-8 bytes
//!
//! The canonical JSON already contains `prev_checksum`; appending it again
//! keeps the layout identical to `H(canon(record) || prev_checksum)`.
//!
//! Signature hash input layout: for each of `data_checksum`, `signer_id`,
//! `meaning`, `signed_at_utc` (RFC 3339), an 8-byte little-endian length
//! followed by the UTF-8 bytes.  Length prefixes keep
//! `("ab", "c")` and `("a", "bc")` from colliding.

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use bioledger_contracts::{
    error::{LedgerError, LedgerResult},
    record::{AuditRecord, CURRENT_CHAIN_VERSION},
    signature::ElectronicSignature,
};

use crate::canonical::canonicalize_record;

/// Lowercase hex SHA-256 over the concatenation of `parts`.
pub fn sha256_hex(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}

/// Whether this build can recompute checksums for `chain_version`.
pub fn is_supported_chain_version(chain_version: u16) -> bool {
    chain_version == CURRENT_CHAIN_VERSION
}

/// Recompute a record's chain checksum from its content and `prev_checksum`.
///
/// The stored `checksum` and `signature` are ignored.
///
/// # Errors
///
/// `LedgerError::Canonicalization` when the record's `chain_version` is not
/// supported by this build or the record cannot be canonicalized.
pub fn compute_record_checksum(record: &AuditRecord) -> LedgerResult<String> {
    if !is_supported_chain_version(record.chain_version) {
        return Err(LedgerError::Canonicalization {
            reason: format!("unsupported chain version {}", record.chain_version),
        });
    }
    let canonical = canonicalize_record(record)?;
    Ok(sha256_hex(&[canonical.as_slice(), record.prev_checksum.as_bytes()]))
}

/// `signed_at_utc` exactly as it is hashed and serialized.
pub fn format_signed_at(signed_at: &DateTime<Utc>) -> String {
    signed_at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Compute `H(data_checksum || signer_id || meaning || signed_at_utc)`.
pub fn compute_signature_hash(
    data_checksum: &str,
    signer_id: &str,
    meaning: &str,
    signed_at: &DateTime<Utc>,
) -> String {
    let signed_at = format_signed_at(signed_at);
    let mut hasher = Sha256::new();
    for field in [data_checksum, signer_id, meaning, signed_at.as_str()] {
        hasher.update((field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Whether a signature's stored hash matches its contents.
pub fn signature_hash_matches(signature: &ElectronicSignature) -> bool {
    compute_signature_hash(
        &signature.data_checksum,
        &signature.signer_id,
        &signature.meaning,
        &signature.signed_at_utc,
    ) == signature.signature_hash
}
