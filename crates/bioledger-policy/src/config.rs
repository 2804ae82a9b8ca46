//! Configuration schema.
//!
//! A `BioledgerConfig` is deserialized from TOML.  Every section is
//! optional; missing sections and fields fall back to the defaults below.
//!
//! Example:
//! ```toml
//! [ledger]
//! store_key = "bioledger/audit/v1"
//! lock_key = "bioledger/system-lock/v1"
//! max_append_retries = 8
//!
//! [signing]
//! reauth_token_ttl_secs = 120
//!
//! [[meanings]]
//! action_type = "UPDATE"
//! allowed = ["approved refund", "reviewed and accepted"]
//! ```

use serde::{Deserialize, Serialize};

use bioledger_contracts::record::ActionType;

/// Where the ledger and lock flag live, and how hard append retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    /// Store key holding the serialized chain.
    pub store_key: String,

    /// Store key holding the persisted `SystemLockState`.
    pub lock_key: String,

    /// Commit attempts before an append fails with `AppendConflict`.
    pub max_append_retries: u32,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            store_key: "bioledger/audit/v1".to_string(),
            lock_key: "bioledger/system-lock/v1".to_string(),
            max_append_retries: 8,
        }
    }
}

/// Re-authentication settings for electronic signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningSettings {
    /// Lifetime of a re-authentication token, in seconds.
    pub reauth_token_ttl_secs: u64,
}

impl Default for SigningSettings {
    fn default() -> Self {
        Self {
            reauth_token_ttl_secs: 120,
        }
    }
}

/// The meanings a signer may state when signing off one action type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeaningRule {
    pub action_type: ActionType,

    /// Exact, case-sensitive meaning strings.
    pub allowed: Vec<String>,
}

/// The top-level structure deserialized from a TOML configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BioledgerConfig {
    pub ledger: LedgerSettings,
    pub signing: SigningSettings,

    /// Rules for the same action type accumulate.  An action type with no
    /// rule cannot be signed.
    pub meanings: Vec<MeaningRule>,
}
