//! Scenario 2: Refund Sign-off with Re-authentication
//!
//! A support agent approves a refund on a disputed device order.  The
//! decision is recorded, then electronically signed.  Four sub-cases:
//!
//! Sub-case A: wrong password at re-auth          → AuthenticationFailed
//! Sub-case B: meaning not allowed for UPDATE     → MeaningNotAllowed
//! Sub-case C: fresh token + "approved refund"    → signed, checksum unchanged
//! Sub-case D: second signature on the same record → AlreadySigned
//!
//! Signing never changes a record's chain checksum, so the chain still
//! verifies after sub-case C.

use std::sync::Arc;

use bioledger_audit::checksum_of_data_record;
use bioledger_contracts::{
    error::{LedgerError, LedgerResult},
    record::{ActionType, AuditRecord, NewAuditEntry},
    signature::{ReAuthMethod, SignatureRequest},
    verify::ChainVerificationReport,
};
use bioledger_core::{MemoryStore, SystemClock};

use crate::mock_data::{
    demo_authenticator, refund_decision, snapshot, support_ticket, SUPPORT_AGENT,
    SUPPORT_AGENT_PASSWORD,
};
use crate::runtime::HealthRuntime;

const TICKET_ID: &str = "CS-1042";

/// How each sub-case ended.
#[derive(Debug)]
pub struct RefundOutcome {
    pub wrong_password: LedgerError,
    pub refused_meaning: LedgerError,
    pub recorded: AuditRecord,
    pub signed: AuditRecord,
    pub second_attempt: LedgerError,
    pub report: ChainVerificationReport,
}

fn request(data_checksum: &str, meaning: &str) -> SignatureRequest {
    SignatureRequest {
        signer_id: SUPPORT_AGENT.to_string(),
        re_auth_method: ReAuthMethod::Password,
        meaning: meaning.to_string(),
        data_checksum: data_checksum.to_string(),
        action_type: ActionType::Update,
    }
}

fn expect_err<T>(result: LedgerResult<T>, sub_case: &str) -> LedgerResult<LedgerError> {
    match result {
        Err(e) => Ok(e),
        Ok(_) => Err(LedgerError::SignaturePrecondition {
            reason: format!("sub-case {} unexpectedly succeeded", sub_case),
        }),
    }
}

/// Run the sign-off walk-through against `runtime`.
pub fn run(runtime: &HealthRuntime) -> LedgerResult<RefundOutcome> {
    let ticket = support_ticket(TICKET_ID);
    let decision = refund_decision(&ticket);
    let data_checksum = checksum_of_data_record(&decision)?;

    let recorded = runtime.record(
        NewAuditEntry::new(SUPPORT_AGENT, ActionType::Update)
            .record("support-ticket", TICKET_ID)
            .reason("refund approved after device fault confirmed")
            .old_val(snapshot(&ticket))
            .new_val(snapshot(&decision))
            .data_checksum(data_checksum.clone()),
    )?;
    println!("  Refund decision recorded: {} (ticket {})", recorded.id, TICKET_ID);
    println!();

    // ── Sub-case A ────────────────────────────────────────────────────────────
    println!("  Sub-case A: re-authentication with the wrong password");
    let wrong_password = expect_err(
        runtime
            .gate()
            .reauthenticate(SUPPORT_AGENT, ReAuthMethod::Password, "tulip-harbor-24"),
        "A",
    )?;
    println!("  Result: {}", wrong_password);
    println!();

    // ── Sub-case B ────────────────────────────────────────────────────────────
    println!("  Sub-case B: meaning outside the UPDATE allow list");
    let token = runtime
        .gate()
        .reauthenticate(SUPPORT_AGENT, ReAuthMethod::Password, SUPPORT_AGENT_PASSWORD)?;
    let refused_meaning = expect_err(
        runtime.sign(&recorded.id, request(&data_checksum, "looks fine"), token),
        "B",
    )?;
    println!("  Allowed meanings: {:?}", runtime.policy().allowed_meanings(ActionType::Update));
    println!("  Result: {}", refused_meaning);
    println!();

    // ── Sub-case C ────────────────────────────────────────────────────────────
    println!("  Sub-case C: fresh re-authentication, meaning \"approved refund\"");
    let token = runtime
        .gate()
        .reauthenticate(SUPPORT_AGENT, ReAuthMethod::Password, SUPPORT_AGENT_PASSWORD)?;
    println!("  Token issued, expires at {}", token.expires_at());
    let signed = runtime.sign(&recorded.id, request(&data_checksum, "approved refund"), token)?;
    if let Some(sig) = &signed.signature {
        println!("  Signed by:       {} ({})", sig.signer_id, sig.re_auth_method);
        println!("  Meaning:         {}", sig.meaning);
        println!("  Signature hash:  {}…", &sig.signature_hash[..16]);
    }
    println!(
        "  Chain checksum:  {}",
        if signed.checksum == recorded.checksum { "unchanged" } else { "CHANGED" }
    );
    println!();

    // ── Sub-case D ────────────────────────────────────────────────────────────
    println!("  Sub-case D: second signature on the same record");
    let token = runtime
        .gate()
        .reauthenticate(SUPPORT_AGENT, ReAuthMethod::Password, SUPPORT_AGENT_PASSWORD)?;
    let second_attempt = expect_err(
        runtime.sign(&recorded.id, request(&data_checksum, "reviewed and accepted"), token),
        "D",
    )?;
    println!("  Result: {}", second_attempt);
    println!();

    let report = runtime.verify_now()?;
    println!("  Verification: {}", report.message);

    Ok(RefundOutcome {
        wrong_password,
        refused_meaning,
        recorded,
        signed,
        second_attempt,
        report,
    })
}

/// Run Scenario 2 on a fresh in-memory store.
pub fn run_scenario() -> LedgerResult<()> {
    println!("=== Scenario 2: Refund Sign-off with Re-authentication ===");
    println!();

    let runtime = HealthRuntime::open_reference(
        Arc::new(MemoryStore::new()),
        Arc::new(SystemClock),
        Arc::new(demo_authenticator()),
    )?;
    runtime.start_session()?;

    let outcome = run(&runtime)?;

    println!();
    println!(
        "  Audit chain integrity:  {} ({} record(s), signature {})",
        if outcome.report.ok { "VERIFIED" } else { "FAILED" },
        outcome.report.count,
        match outcome.report.results.first().and_then(|r| r.signature_ok) {
            Some(true) => "valid",
            Some(false) => "INVALID",
            None => "missing",
        }
    );
    println!();
    println!("  Scenario 2 complete.");
    println!();

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome() -> RefundOutcome {
        let runtime = HealthRuntime::open_reference(
            Arc::new(MemoryStore::new()),
            Arc::new(SystemClock),
            Arc::new(demo_authenticator()),
        )
        .unwrap();
        run(&runtime).unwrap()
    }

    #[test]
    fn test_sub_cases_fail_as_expected() {
        let outcome = outcome();
        assert!(matches!(outcome.wrong_password, LedgerError::AuthenticationFailed { .. }));
        assert!(matches!(outcome.refused_meaning, LedgerError::MeaningNotAllowed { .. }));
        assert!(matches!(outcome.second_attempt, LedgerError::AlreadySigned { .. }));
    }

    #[test]
    fn test_signature_leaves_chain_intact() {
        let outcome = outcome();
        assert_eq!(outcome.signed.checksum, outcome.recorded.checksum);

        let sig = outcome.signed.signature.as_ref().unwrap();
        assert_eq!(sig.meaning, "approved refund");
        assert_eq!(sig.signer_id, SUPPORT_AGENT);
        assert_eq!(Some(sig.data_checksum.as_str()), outcome.recorded.data_checksum.as_deref());

        assert!(outcome.report.ok, "{}", outcome.report.message);
        assert_eq!(outcome.report.results[0].signature_ok, Some(true));
    }

    #[test]
    fn test_reference_policy_meanings() {
        let runtime = HealthRuntime::open_reference(
            Arc::new(MemoryStore::new()),
            Arc::new(SystemClock),
            Arc::new(demo_authenticator()),
        )
        .unwrap();
        let policy = runtime.policy();
        assert!(policy.is_meaning_allowed(ActionType::Update, "approved refund"));
        assert!(!policy.is_meaning_allowed(ActionType::Read, "approved refund"));
        assert_eq!(policy.signing().reauth_token_ttl_secs, 120);
    }
}
