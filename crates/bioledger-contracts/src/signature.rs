//! Electronic signature types.
//!
//! An `ElectronicSignature` binds a signer's stated intent (`meaning`) to a
//! data checksum at a ledger-stamped instant.  It is distinct from the chain
//! checksum and attaching it never changes a record's `checksum`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::ActionType;

/// How the signer re-proved their identity immediately before signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReAuthMethod {
    Password,
    Biometric,
}

impl ReAuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReAuthMethod::Password => "password",
            ReAuthMethod::Biometric => "biometric",
        }
    }
}

impl fmt::Display for ReAuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-repudiation assertion over a data checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectronicSignature {
    pub signer_id: String,
    pub re_auth_method: ReAuthMethod,

    /// Stated intent, drawn from the allowed list for the action type.
    pub meaning: String,

    /// The data checksum this signature covers.
    pub data_checksum: String,

    /// Stamped by the signature service, never supplied by the caller.
    pub signed_at_utc: DateTime<Utc>,

    /// `H(data_checksum || signer_id || meaning || signed_at_utc)`, hex.
    pub signature_hash: String,
}

/// What a caller asks the signature service to sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRequest {
    pub signer_id: String,
    pub re_auth_method: ReAuthMethod,
    pub meaning: String,
    pub data_checksum: String,

    /// Action type of the record being signed; selects the allowed meanings.
    pub action_type: ActionType,
}
