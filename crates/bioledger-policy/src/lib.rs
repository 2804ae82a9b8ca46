//! # bioledger-policy
//!
//! TOML configuration for the audit ledger and a deny-by-default policy of
//! which signature meanings each action type accepts.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use bioledger_policy::SigningPolicy;
//!
//! let policy = SigningPolicy::from_file(Path::new("config/bioledger.toml"))?;
//! let ttl = policy.signing().reauth_token_ttl_secs;
//! ```
//!
//! ## Meaning matching
//!
//! Meanings are compared verbatim (case-sensitive).  An action type with no
//! `[[meanings]]` entry cannot be signed at all.

pub mod config;
pub mod policy;

pub use config::{BioledgerConfig, LedgerSettings, MeaningRule, SigningSettings};
pub use policy::SigningPolicy;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use bioledger_contracts::{error::LedgerError, record::ActionType};

    use crate::SigningPolicy;

    // ── 1. deny-by-default ────────────────────────────────────────────────────

    #[test]
    fn test_deny_by_default() {
        let policy = SigningPolicy::from_toml_str("").unwrap();
        assert!(!policy.is_meaning_allowed(ActionType::Update, "approved refund"));
        assert!(policy.allowed_meanings(ActionType::Update).is_empty());
    }

    // ── 2. defaults fill missing sections ─────────────────────────────────────

    #[test]
    fn test_defaults_apply() {
        let policy = SigningPolicy::from_toml_str(
            r#"
            [signing]
            reauth_token_ttl_secs = 30
        "#,
        )
        .unwrap();

        assert_eq!(policy.signing().reauth_token_ttl_secs, 30);
        assert_eq!(policy.ledger().store_key, "bioledger/audit/v1");
        assert_eq!(policy.ledger().lock_key, "bioledger/system-lock/v1");
        assert_eq!(policy.ledger().max_append_retries, 8);
    }

    // ── 3. per-action allow lists ─────────────────────────────────────────────

    #[test]
    fn test_meanings_are_scoped_to_action_type() {
        let toml = r#"
            [[meanings]]
            action_type = "UPDATE"
            allowed = ["approved refund", "reviewed and accepted"]

            [[meanings]]
            action_type = "DELETE"
            allowed = ["approved deletion"]

            [[meanings]]
            action_type = "UPDATE"
            allowed = ["confirmed AI recommendation"]
        "#;

        let policy = SigningPolicy::from_toml_str(toml).unwrap();

        assert!(policy.is_meaning_allowed(ActionType::Update, "approved refund"));
        assert!(policy.is_meaning_allowed(ActionType::Update, "confirmed AI recommendation"));
        assert!(!policy.is_meaning_allowed(ActionType::Update, "approved deletion"));
        assert!(policy.is_meaning_allowed(ActionType::Delete, "approved deletion"));
        assert!(!policy.is_meaning_allowed(ActionType::Create, "approved refund"));
        assert_eq!(
            policy.allowed_meanings(ActionType::Update),
            vec!["approved refund", "reviewed and accepted", "confirmed AI recommendation"]
        );
    }

    // ── 4. verbatim matching ──────────────────────────────────────────────────

    #[test]
    fn test_meaning_match_is_exact() {
        let policy = SigningPolicy::from_toml_str(
            r#"
            [[meanings]]
            action_type = "UPDATE"
            allowed = ["approved refund"]
        "#,
        )
        .unwrap();

        assert!(!policy.is_meaning_allowed(ActionType::Update, "Approved Refund"));
        assert!(!policy.is_meaning_allowed(ActionType::Update, "approved refund "));
        assert!(!policy.is_meaning_allowed(ActionType::Update, ""));
    }

    // ── 5. invalid configuration ──────────────────────────────────────────────

    #[test]
    fn test_empty_meaning_rejected() {
        let result = SigningPolicy::from_toml_str(
            r#"
            [[meanings]]
            action_type = "UPDATE"
            allowed = ["  "]
        "#,
        );
        match result {
            Err(LedgerError::Config { reason }) => assert!(reason.contains("empty meaning")),
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_shared_keys_rejected() {
        let result = SigningPolicy::from_toml_str(
            r#"
            [ledger]
            store_key = "same"
            lock_key = "same"
        "#,
        );
        assert!(matches!(result, Err(LedgerError::Config { .. })));
    }

    #[test]
    fn test_toml_parse_error() {
        let result = SigningPolicy::from_toml_str("this is not valid toml ][[[");
        match result {
            Err(LedgerError::Config { reason }) => {
                assert!(
                    reason.contains("failed to parse bioledger TOML"),
                    "expected parse error message, got: {reason}"
                );
            }
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_action_type_rejected() {
        let result = SigningPolicy::from_toml_str(
            r#"
            [[meanings]]
            action_type = "ARCHIVE"
            allowed = ["approved"]
        "#,
        );
        assert!(matches!(result, Err(LedgerError::Config { .. })));
    }
}
