//! Audit record types.
//!
//! `AuditRecord` is one link in the hash chain.  `NewAuditEntry` is what a
//! caller hands to the ledger; everything the ledger itself is responsible
//! for (id, timestamp, linkage, checksum) is absent from it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::signature::ElectronicSignature;

/// The `prev_checksum` of the first record in every ledger.
pub const GENESIS: &str = "GENESIS";

/// Chain version of records written by this build: canonical JSON v1 + SHA-256.
pub const CURRENT_CHAIN_VERSION: u16 = 1;

/// The kind of regulated action being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionType {
    Create,
    Read,
    Update,
    Delete,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Create => "CREATE",
            ActionType::Read => "READ",
            ActionType::Update => "UPDATE",
            ActionType::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A caller-supplied before/after snapshot, already encoded by the caller.
///
/// The ledger hashes the encoded string as a single leaf and never looks
/// inside it, so arbitrary application objects never reach the canonicalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(pub String);

impl Snapshot {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One entry in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// Unique id assigned at append time.
    pub id: String,

    /// Assigned by the ledger's clock, never by the caller.
    pub timestamp_utc: DateTime<Utc>,

    pub user_id: String,
    pub action_type: ActionType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_val: Option<Snapshot>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_val: Option<Snapshot>,

    /// Hash of a caller payload; the target of electronic signatures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_checksum: Option<String>,

    /// Canonical encoding + hash algorithm this record was sealed with.
    pub chain_version: u16,

    /// `checksum` of the preceding record, or [`GENESIS`].
    pub prev_checksum: String,

    /// Chain checksum over every field except `checksum` and `signature`.
    pub checksum: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<ElectronicSignature>,
}

impl AuditRecord {
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }
}

/// The caller-supplied part of an audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAuditEntry {
    pub user_id: String,
    pub action_type: ActionType,
    #[serde(default)]
    pub record_type: Option<String>,
    #[serde(default)]
    pub record_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub old_val: Option<Snapshot>,
    #[serde(default)]
    pub new_val: Option<Snapshot>,
    #[serde(default)]
    pub data_checksum: Option<String>,
}

impl NewAuditEntry {
    /// An entry with only the mandatory fields set.
    pub fn new(user_id: impl Into<String>, action_type: ActionType) -> Self {
        Self {
            user_id: user_id.into(),
            action_type,
            record_type: None,
            record_id: None,
            reason: None,
            old_val: None,
            new_val: None,
            data_checksum: None,
        }
    }

    pub fn record(mut self, record_type: impl Into<String>, record_id: impl Into<String>) -> Self {
        self.record_type = Some(record_type.into());
        self.record_id = Some(record_id.into());
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn old_val(mut self, snapshot: Snapshot) -> Self {
        self.old_val = Some(snapshot);
        self
    }

    pub fn new_val(mut self, snapshot: Snapshot) -> Self {
        self.new_val = Some(snapshot);
        self
    }

    pub fn data_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.data_checksum = Some(checksum.into());
        self
    }
}

/// The current end of the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTail {
    /// Number of records in the ledger.
    pub count: usize,
    /// `checksum` of the last record, or [`GENESIS`] when empty.
    pub checksum: String,
}

impl ChainTail {
    pub fn genesis() -> Self {
        Self {
            count: 0,
            checksum: GENESIS.to_string(),
        }
    }
}
