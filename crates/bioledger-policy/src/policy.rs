//! Signing-meaning policy.
//!
//! `SigningPolicy` loads a `BioledgerConfig` from a TOML string or file and
//! answers one question: may a signer state this meaning when signing off
//! this action type?  Anything not explicitly listed is refused.

use std::path::Path;

use tracing::debug;

use bioledger_contracts::{
    error::{LedgerError, LedgerResult},
    record::ActionType,
};

use crate::config::{BioledgerConfig, LedgerSettings, SigningSettings};

/// Deny-by-default allow list of signature meanings, plus the rest of the
/// loaded configuration.
///
/// ```rust,ignore
/// use bioledger_policy::SigningPolicy;
///
/// let policy = SigningPolicy::from_file(Path::new("config/bioledger.toml"))?;
/// assert!(policy.is_meaning_allowed(ActionType::Update, "approved refund"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SigningPolicy {
    config: BioledgerConfig,
}

impl SigningPolicy {
    /// Parse `s` as TOML and build a `SigningPolicy`.
    ///
    /// Returns `LedgerError::Config` if the TOML is malformed, does not match
    /// `BioledgerConfig`, or lists an empty meaning.
    pub fn from_toml_str(s: &str) -> LedgerResult<Self> {
        let config: BioledgerConfig = toml::from_str(s).map_err(|e| LedgerError::Config {
            reason: format!("failed to parse bioledger TOML: {}", e),
        })?;
        Self::from_config(config)
    }

    /// Read the file at `path` and parse it as TOML configuration.
    pub fn from_file(path: &Path) -> LedgerResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| LedgerError::Config {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_config(config: BioledgerConfig) -> LedgerResult<Self> {
        for rule in &config.meanings {
            if rule.allowed.iter().any(|m| m.trim().is_empty()) {
                return Err(LedgerError::Config {
                    reason: format!("empty meaning listed for {}", rule.action_type),
                });
            }
        }
        if config.ledger.store_key == config.ledger.lock_key {
            return Err(LedgerError::Config {
                reason: "ledger store_key and lock_key must differ".to_string(),
            });
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &BioledgerConfig {
        &self.config
    }

    pub fn ledger(&self) -> &LedgerSettings {
        &self.config.ledger
    }

    pub fn signing(&self) -> &SigningSettings {
        &self.config.signing
    }

    /// Every meaning allowed for `action_type`, in declaration order.
    pub fn allowed_meanings(&self, action_type: ActionType) -> Vec<&str> {
        self.config
            .meanings
            .iter()
            .filter(|rule| rule.action_type == action_type)
            .flat_map(|rule| rule.allowed.iter().map(String::as_str))
            .collect()
    }

    /// True only if `meaning` is listed verbatim for `action_type`.
    pub fn is_meaning_allowed(&self, action_type: ActionType, meaning: &str) -> bool {
        let allowed = self
            .allowed_meanings(action_type)
            .into_iter()
            .any(|m| m == meaning);
        debug!(action_type = %action_type, meaning = %meaning, allowed, "meaning policy checked");
        allowed
    }
}
