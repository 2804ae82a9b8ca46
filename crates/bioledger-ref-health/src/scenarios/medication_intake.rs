//! Scenario 1: Medication Intake Logging
//!
//! A patient logs a dose, opens their schedule, then corrects the dose they
//! entered.  Each action becomes one chained audit record:
//!
//!   1. CREATE medication-intake   (new value snapshot + data checksum)
//!   2. READ   medication-schedule
//!   3. UPDATE medication-intake   (old and new value snapshots)
//!
//! The scenario ends with a detailed verification showing every record's
//! checksum and link.

use std::sync::Arc;

use bioledger_audit::checksum_of_data_record;
use bioledger_contracts::{
    error::LedgerResult,
    record::{ActionType, AuditRecord, NewAuditEntry},
    verify::ChainVerificationReport,
};
use bioledger_core::{MemoryStore, SystemClock};

use crate::mock_data::{
    demo_authenticator, intake_event, medication_schedule, snapshot, PATIENT_ID, PATIENT_USER,
};
use crate::runtime::HealthRuntime;

/// What the scenario left in the ledger.
#[derive(Debug)]
pub struct IntakeOutcome {
    pub records: Vec<AuditRecord>,
    pub report: ChainVerificationReport,
}

/// Run the intake walk-through against `runtime`.
pub fn run(runtime: &HealthRuntime) -> LedgerResult<IntakeOutcome> {
    let logged = intake_event(PATIENT_ID, "Metformin", "500 mg", "2024-07-01T08:05:00Z");
    let corrected = intake_event(PATIENT_ID, "Metformin", "1000 mg", "2024-07-01T08:05:00Z");

    let create = runtime.record(
        NewAuditEntry::new(PATIENT_USER, ActionType::Create)
            .record("medication-intake", "intake-0701-am")
            .reason("dose logged from tracker")
            .new_val(snapshot(&logged))
            .data_checksum(checksum_of_data_record(&logged)?),
    )?;
    println!("  [CREATE] medication-intake  id={}  checksum={}…", create.id, &create.checksum[..16]);

    let schedule = medication_schedule(PATIENT_ID);
    let read = runtime.record(
        NewAuditEntry::new(PATIENT_USER, ActionType::Read)
            .record("medication-schedule", PATIENT_ID)
            .reason("schedule viewed")
            .data_checksum(checksum_of_data_record(&schedule)?),
    )?;
    println!("  [READ]   medication-schedule id={}  prev={}…", read.id, &read.prev_checksum[..16]);

    let update = runtime.record(
        NewAuditEntry::new(PATIENT_USER, ActionType::Update)
            .record("medication-intake", "intake-0701-am")
            .reason("dose corrected: two tablets taken")
            .old_val(snapshot(&logged))
            .new_val(snapshot(&corrected))
            .data_checksum(checksum_of_data_record(&corrected)?),
    )?;
    println!("  [UPDATE] medication-intake  id={}  prev={}…", update.id, &update.prev_checksum[..16]);
    println!();

    let report = runtime.verify_now()?;
    for result in &report.results {
        println!(
            "  #{:<2} checksum {:<4} link {:<4} {}",
            result.index,
            if result.checksum_ok { "OK" } else { "FAIL" },
            if result.prev_ok { "OK" } else { "FAIL" },
            result.id
        );
    }
    println!("  Verification: {}", report.message);

    Ok(IntakeOutcome {
        records: vec![create, read, update],
        report,
    })
}

/// Run Scenario 1 on a fresh in-memory store.
pub fn run_scenario() -> LedgerResult<()> {
    println!("=== Scenario 1: Medication Intake Logging ===");
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
        "  Audit chain integrity:  {} ({} record(s) in chain)",
        if outcome.report.ok { "VERIFIED" } else { "FAILED" },
        outcome.report.count
    );
    println!();
    println!("  Scenario 1 complete.");
    println!();

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
