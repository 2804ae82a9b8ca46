//! # bioledger-sign
//!
//! Re-authentication and electronic signatures.
//!
//! ```rust,ignore
//! let token = gate.reauthenticate("dr-lee", ReAuthMethod::Password, "hunter2")?;
//! let signed = service.sign_record(&record.id, request, token)?;
//! ```
//!
//! Signing always costs one fresh token.  Tokens are issued by a
//! `ReAuthGate` after an `Authenticator` accepts the signer's credential.

pub mod reauth;
pub mod service;

pub use reauth::{InMemoryAuthenticator, ReAuthGate, ReAuthToken};
pub use service::SignatureService;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};

    use bioledger_audit::AuditLedger;
    use bioledger_contracts::{
        error::LedgerError,
        record::{ActionType, AuditRecord, NewAuditEntry},
        signature::{ReAuthMethod, SignatureRequest},
    };
    use bioledger_core::{traits::KvStore, ManualClock, MemoryStore};
    use bioledger_policy::SigningPolicy;

    use super::*;

    const POLICY: &str = r#"
        [signing]
        reauth_token_ttl_secs = 60

        [[meanings]]
        action_type = "UPDATE"
        allowed = ["approved refund", "reviewed and accepted"]
    "#;

    const CHECKSUM: &str = "4f1c8a0e6b2d4e9f8a7c6b5d4e3f2a1b0c9d8e7f6a5b4c3d2e1f0a9b8c7d6e5f";

    struct Fixture {
        clock: Arc<ManualClock>,
        ledger: Arc<AuditLedger>,
        gate: Arc<ReAuthGate>,
        service: SignatureService,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 9, 2, 14, 30, 0).unwrap()));
        let ledger = Arc::new(AuditLedger::new(store, clock.clone()));
        let policy = Arc::new(SigningPolicy::from_toml_str(POLICY).unwrap());

        let authenticator = InMemoryAuthenticator::new()
            .with_credential("agent-7", ReAuthMethod::Password, "correct horse")
            .with_credential("agent-7", ReAuthMethod::Biometric, "thumb-template")
            .with_credential("agent-9", ReAuthMethod::Password, "battery staple");
        let gate = Arc::new(ReAuthGate::with_ttl_secs(
            Arc::new(authenticator),
            clock.clone(),
            policy.signing().reauth_token_ttl_secs,
        ));
        let service = SignatureService::new(Arc::clone(&ledger), policy, Arc::clone(&gate), clock.clone());

        Fixture { clock, ledger, gate, service }
    }

    fn request(meaning: &str) -> SignatureRequest {
        SignatureRequest {
            signer_id: "agent-7".to_string(),
            re_auth_method: ReAuthMethod::Password,
            meaning: meaning.to_string(),
            data_checksum: CHECKSUM.to_string(),
            action_type: ActionType::Update,
        }
    }

    fn token(f: &Fixture) -> ReAuthToken {
        f.gate
            .reauthenticate("agent-7", ReAuthMethod::Password, "correct horse")
            .unwrap()
    }

    fn refund_record(f: &Fixture) -> AuditRecord {
        f.ledger
            .append(
                NewAuditEntry::new("agent-7", ActionType::Update)
                    .record("ticket", "CS-1042")
                    .reason("refund issued")
                    .data_checksum(CHECKSUM),
            )
            .unwrap()
    }

    // ── Re-authentication ─────────────────────────────────────────────────────

    #[test]
    fn test_wrong_credential_rejected() {
        let f = fixture();
        let err = f
            .gate
            .reauthenticate("agent-7", ReAuthMethod::Password, "wrong")
            .unwrap_err();
        assert!(matches!(err, LedgerError::AuthenticationFailed { ref signer_id } if signer_id == "agent-7"));

        // Credentials are per method.
        assert!(f
            .gate
            .reauthenticate("agent-7", ReAuthMethod::Biometric, "correct horse")
            .is_err());
        assert!(f
            .gate
            .reauthenticate("nobody", ReAuthMethod::Password, "correct horse")
            .is_err());
    }

    #[test]
    fn test_token_carries_binding_and_expiry() {
        let f = fixture();
        let token = token(&f);
        assert_eq!(token.signer_id(), "agent-7");
        assert_eq!(token.method(), ReAuthMethod::Password);
        assert_eq!(token.expires_at(), Utc.with_ymd_and_hms(2024, 9, 2, 14, 31, 0).unwrap());
        assert_eq!(f.gate.ttl(), Duration::seconds(60));
        let debug = format!("{:?}", token);
        assert!(!debug.contains("value"), "token value must not leak through Debug");
    }

    #[test]
    fn test_token_is_single_use() {
        let f = fixture();
        let token = token(&f);
        f.gate.redeem(&token, "agent-7", ReAuthMethod::Password).unwrap();

        let err = f
            .service
            .create_electronic_signature(request("approved refund"), token)
            .unwrap_err();
        assert!(matches!(err, LedgerError::ReAuthRequired { .. }));
    }

    #[test]
    fn test_expired_token_rejected() {
        let f = fixture();
        let token = token(&f);
        f.clock.advance(Duration::seconds(61));
        let err = f
            .service
            .create_electronic_signature(request("approved refund"), token)
            .unwrap_err();
        match err {
            LedgerError::ReAuthRequired { reason } => assert!(reason.contains("expired")),
            other => panic!("expected ReAuthRequired, got {:?}", other),
        }
    }

    #[test]
    fn test_token_at_expiry_instant_still_valid() {
        let f = fixture();
        let token = token(&f);
        f.clock.advance(Duration::seconds(60));
        assert!(f
            .service
            .create_electronic_signature(request("approved refund"), token)
            .is_ok());
    }

    #[test]
    fn test_token_bound_to_signer() {
        let f = fixture();
        let other = f
            .gate
            .reauthenticate("agent-9", ReAuthMethod::Password, "battery staple")
            .unwrap();
        let err = f
            .service
            .create_electronic_signature(request("approved refund"), other)
            .unwrap_err();
        match err {
            LedgerError::ReAuthRequired { reason } => assert!(reason.contains("agent-9")),
            other => panic!("expected ReAuthRequired, got {:?}", other),
        }
    }

    #[test]
    fn test_token_bound_to_method() {
        let f = fixture();
        let biometric = f
            .gate
            .reauthenticate("agent-7", ReAuthMethod::Biometric, "thumb-template")
            .unwrap();
        let err = f
            .service
            .create_electronic_signature(request("approved refund"), biometric)
            .unwrap_err();
        assert!(matches!(err, LedgerError::ReAuthRequired { .. }));
    }

    // ── Signature creation ────────────────────────────────────────────────────

    #[test]
    fn test_create_stamps_time_and_hash() {
        let f = fixture();
        let signature = f
            .service
            .create_electronic_signature(request("approved refund"), token(&f))
            .unwrap();

        assert_eq!(signature.signer_id, "agent-7");
        assert_eq!(signature.meaning, "approved refund");
        assert_eq!(signature.data_checksum, CHECKSUM);
        assert_eq!(signature.signed_at_utc, Utc.with_ymd_and_hms(2024, 9, 2, 14, 30, 0).unwrap());
        assert_eq!(signature.signature_hash.len(), 64);
        assert!(f.service.verify_signature(&signature));

        let mut forged = signature.clone();
        forged.meaning = "reviewed and accepted".to_string();
        assert!(!f.service.verify_signature(&forged));
    }

    #[test]
    fn test_empty_fields_rejected() {
        let f = fixture();
        let mut empty_signer = request("approved refund");
        empty_signer.signer_id = String::new();
        let mut empty_checksum = request("approved refund");
        empty_checksum.data_checksum = "  ".to_string();

        for (req, field) in [
            (empty_signer, "signer_id"),
            (request(""), "meaning"),
            (empty_checksum, "data_checksum"),
        ] {
            match f.service.create_electronic_signature(req, token(&f)) {
                Err(LedgerError::SignaturePrecondition { reason }) => assert!(reason.contains(field)),
                other => panic!("expected SignaturePrecondition for {field}, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_meaning_must_be_allowed_for_action_type() {
        let f = fixture();
        let err = f
            .service
            .create_electronic_signature(request("looks fine to me"), token(&f))
            .unwrap_err();
        assert!(matches!(err, LedgerError::MeaningNotAllowed { .. }));

        let mut delete = request("approved refund");
        delete.action_type = ActionType::Delete;
        let err = f.service.create_electronic_signature(delete, token(&f)).unwrap_err();
        match err {
            LedgerError::MeaningNotAllowed { action_type, .. } => assert_eq!(action_type, "DELETE"),
            other => panic!("expected MeaningNotAllowed, got {:?}", other),
        }
    }

    // ── sign_record ───────────────────────────────────────────────────────────

    #[test]
    fn test_sign_record_attaches_without_changing_checksum() {
        let f = fixture();
        let record = refund_record(&f);

        let signed = f
            .service
            .sign_record(&record.id, request("approved refund"), token(&f))
            .unwrap();

        assert_eq!(signed.checksum, record.checksum);
        let signature = signed.signature.as_ref().unwrap();
        assert_eq!(signature.meaning, "approved refund");
        assert!(f.service.verify_signature(signature));
        assert!(f.ledger.get_log().unwrap()[0].is_signed());
    }

    #[test]
    fn test_sign_record_twice_fails() {
        let f = fixture();
        let record = refund_record(&f);
        f.service
            .sign_record(&record.id, request("approved refund"), token(&f))
            .unwrap();

        f.clock.advance(Duration::seconds(1));
        let err = f
            .service
            .sign_record(&record.id, request("reviewed and accepted"), token(&f))
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadySigned { .. }));
    }

    #[test]
    fn test_sign_record_checks_action_type_and_checksum() {
        let f = fixture();
        let record = refund_record(&f);

        let mut wrong_action = request("approved refund");
        wrong_action.action_type = ActionType::Create;
        let err = f.service.sign_record(&record.id, wrong_action, token(&f)).unwrap_err();
        assert!(matches!(err, LedgerError::SignaturePrecondition { .. }));

        let mut wrong_checksum = request("approved refund");
        wrong_checksum.data_checksum = "0".repeat(64);
        let err = f.service.sign_record(&record.id, wrong_checksum, token(&f)).unwrap_err();
        assert!(matches!(err, LedgerError::SignatureMismatch { .. }));

        assert!(!f.ledger.get_log().unwrap()[0].is_signed());
    }

    #[test]
    fn test_refused_sign_record_keeps_token_outstanding() {
        let f = fixture();
        let record = refund_record(&f);

        let mut wrong_checksum = request("approved refund");
        wrong_checksum.data_checksum = "0".repeat(64);
        let err = f.service.sign_record(&record.id, wrong_checksum, token(&f)).unwrap_err();
        assert!(matches!(err, LedgerError::SignatureMismatch { .. }));
        assert_eq!(f.gate.outstanding(), 1, "refused request must not redeem the token");

        f.service
            .sign_record(&record.id, request("approved refund"), token(&f))
            .unwrap();
        assert_eq!(f.gate.outstanding(), 1);
    }

    #[test]
    fn test_sign_unknown_record() {
        let f = fixture();
        let err = f
            .service
            .sign_record("no-such-id", request("approved refund"), token(&f))
            .unwrap_err();
        assert!(matches!(err, LedgerError::RecordNotFound { .. }));
    }
}
