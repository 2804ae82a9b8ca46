//! # bioledger-contracts
//!
//! Shared types and the error taxonomy for the bioledger audit ledger.
//!
//! All crates in the workspace import from here. No ledger logic lives in
//! this crate, only data definitions and error types.

pub mod error;
pub mod lock;
pub mod record;
pub mod signature;
pub mod verify;

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;
    use error::LedgerError;
    use record::{ActionType, AuditRecord, NewAuditEntry, Snapshot, GENESIS};
    use verify::{ChainVerificationReport, VerifyRecordResult};

    fn result(index: usize, checksum_ok: bool, prev_ok: bool) -> VerifyRecordResult {
        VerifyRecordResult {
            id: format!("rec-{index}"),
            index,
            timestamp_utc: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, index as u32).unwrap(),
            checksum_ok,
            prev_ok,
            expected_checksum: "a".repeat(64),
            actual_checksum: "a".repeat(64),
            expected_prev_checksum: GENESIS.to_string(),
            actual_prev_checksum: GENESIS.to_string(),
            signature_ok: None,
        }
    }

    // ── Serialized shape ─────────────────────────────────────────────────────

    #[test]
    fn action_type_serializes_upper_case() {
        assert_eq!(serde_json::to_value(ActionType::Create).unwrap(), json!("CREATE"));
        assert_eq!(serde_json::to_value(ActionType::Delete).unwrap(), json!("DELETE"));
        let decoded: ActionType = serde_json::from_value(json!("UPDATE")).unwrap();
        assert_eq!(decoded, ActionType::Update);
    }

    #[test]
    fn audit_record_uses_camel_case_and_omits_absent_fields() {
        let record = AuditRecord {
            id: "rec-1".to_string(),
            timestamp_utc: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
            user_id: "u1".to_string(),
            action_type: ActionType::Read,
            record_type: None,
            record_id: None,
            reason: None,
            old_val: None,
            new_val: Some(Snapshot::new(r#"{"dose":"5mg"}"#)),
            data_checksum: None,
            chain_version: 1,
            prev_checksum: GENESIS.to_string(),
            checksum: "b".repeat(64),
            signature: None,
        };

        let value = serde_json::to_value(&record).unwrap();
        let obj = value.as_object().unwrap();
        assert!(obj.contains_key("timestampUtc"));
        assert!(obj.contains_key("prevChecksum"));
        assert!(!obj.contains_key("reason"));
        assert!(!obj.contains_key("signature"));
        // Snapshots stay opaque strings.
        assert_eq!(obj["newVal"], json!(r#"{"dose":"5mg"}"#));
    }

    #[test]
    fn new_entry_builder_sets_optional_fields() {
        let entry = NewAuditEntry::new("u1", ActionType::Update)
            .record("medication", "med-7")
            .reason("dose change")
            .data_checksum("c".repeat(64));

        assert_eq!(entry.record_type.as_deref(), Some("medication"));
        assert_eq!(entry.record_id.as_deref(), Some("med-7"));
        assert_eq!(entry.reason.as_deref(), Some("dose change"));
        assert!(entry.old_val.is_none());
        assert_eq!(entry.data_checksum.as_deref().map(str::len), Some(64));
    }

    // ── Breach summary ───────────────────────────────────────────────────────

    #[test]
    fn first_broken_link_is_smallest_failing_index() {
        let report = ChainVerificationReport {
            ok: false,
            message: "breach".to_string(),
            count: 4,
            results: vec![
                result(0, true, true),
                result(1, false, true),
                result(2, true, false),
                result(3, true, true),
            ],
        };

        let first = report.first_broken_link().unwrap();
        assert_eq!(first.index, 1);

        let summary = report.breach_summary().unwrap();
        assert_eq!(summary.first_broken_index, Some(1));
        assert_eq!(summary.first_broken_id.as_deref(), Some("rec-1"));
        assert_eq!(summary.failing_count, 2);
    }

    #[test]
    fn intact_report_has_no_breach_summary() {
        let report = ChainVerificationReport {
            ok: true,
            message: "ok".to_string(),
            count: 1,
            results: vec![result(0, true, true)],
        };
        assert!(report.first_broken_link().is_none());
        assert!(report.breach_summary().is_none());
    }

    // ── LedgerError display messages ─────────────────────────────────────────

    #[test]
    fn error_already_signed_display() {
        let err = LedgerError::AlreadySigned {
            record_id: "rec-9".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("already signed"));
        assert!(msg.contains("rec-9"));
    }

    #[test]
    fn error_meaning_not_allowed_display() {
        let err = LedgerError::MeaningNotAllowed {
            meaning: "looks fine".to_string(),
            action_type: "DELETE".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("looks fine"));
        assert!(msg.contains("DELETE"));
    }

    #[test]
    fn error_append_conflict_display() {
        let err = LedgerError::AppendConflict { attempts: 8 };
        assert!(err.to_string().contains("8 attempts"));
    }
}
