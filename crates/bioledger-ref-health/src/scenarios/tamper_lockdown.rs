//! Scenario 3: Tamper, Breach, Lock, Restart
//!
//! 1. `u1` records CREATE, READ and UPDATE; verification passes.
//! 2. Someone with raw store access rewrites `records[1].reason`.
//! 3. Detailed verification pinpoints index 1 and flags index 2's link.
//! 4. The failing report locks the system; further records are refused.
//! 5. The application restarts over the same store: the lock is re-entered
//!    from persisted state, without re-running verification.

use std::sync::Arc;

use serde_json::Value;

use bioledger_contracts::{
    error::{LedgerError, LedgerResult},
    lock::SystemLockState,
    record::{ActionType, NewAuditEntry},
    verify::ChainVerificationReport,
};
use bioledger_core::{
    traits::{Authenticator, Clock, KvStore},
    MemoryStore, SystemClock,
};
use bioledger_verify::LockStatus;

use crate::mock_data::demo_authenticator;
use crate::runtime::HealthRuntime;

/// What the scenario observed before and after the restart.
#[derive(Debug)]
pub struct TamperOutcome {
    pub before: ChainVerificationReport,
    pub after: ChainVerificationReport,
    pub refused: LedgerError,
    pub restart_status: LockStatus,
    pub lock_after_restart: SystemLockState,
}

/// Overwrite one field of one stored record, bypassing the ledger.
pub fn tamper_field(
    store: &dyn KvStore,
    store_key: &str,
    index: usize,
    field: &str,
    value: Value,
) -> LedgerResult<()> {
    let corrupt = |reason: String| LedgerError::CorruptLog { reason };

    let raw = store
        .read(store_key)?
        .ok_or_else(|| corrupt(format!("nothing stored under '{}'", store_key)))?;
    let mut records: Vec<Value> =
        serde_json::from_slice(&raw).map_err(|e| corrupt(e.to_string()))?;
    let record = records
        .get_mut(index)
        .and_then(Value::as_object_mut)
        .ok_or_else(|| corrupt(format!("no record at index {}", index)))?;
    record.insert(field.to_string(), value);

    let encoded = serde_json::to_vec(&records).map_err(|e| corrupt(e.to_string()))?;
    store.write(store_key, &encoded)
}

/// Run the walk-through over `store`, opening the runtime twice.
pub fn run(
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    authenticator: Arc<dyn Authenticator>,
) -> LedgerResult<TamperOutcome> {
    let runtime = HealthRuntime::open_reference(
        Arc::clone(&store),
        Arc::clone(&clock),
        Arc::clone(&authenticator),
    )?;
    runtime.start_session()?;

    for (action, reason) in [
        (ActionType::Create, "profile created"),
        (ActionType::Read, "lab results viewed"),
        (ActionType::Update, "allergy list updated"),
    ] {
        runtime.record(
            NewAuditEntry::new("u1", action)
                .record("health-profile", "hp-u1")
                .reason(reason),
        )?;
    }

    let before = runtime.verify_now()?;
    println!("  Before tampering: {}", before.message);

    let store_key = runtime.ledger().store_key().to_string();
    tamper_field(store.as_ref(), &store_key, 1, "reason", Value::from("routine check"))?;
    println!("  records[1].reason rewritten directly in the store");
    println!();

    let after = runtime.verify_now()?;
    for result in &after.results {
        println!(
            "  #{:<2} checksum {:<4} link {:<4} {}",
            result.index,
            if result.checksum_ok { "OK" } else { "FAIL" },
            if result.prev_ok { "OK" } else { "FAIL" },
            result.id
        );
    }
    if let Some(summary) = after.breach_summary() {
        println!(
            "  Breach: {} failing record(s), first at index {}",
            summary.failing_count,
            summary
                .first_broken_index
                .map(|i| i.to_string())
                .unwrap_or_else(|| "?".to_string())
        );
    }
    println!("  System locked:   {}", runtime.lock().is_locked());

    let refused = match runtime.record(NewAuditEntry::new("u1", ActionType::Read).reason("after breach")) {
        Err(e) => e,
        Ok(record) => {
            return Err(LedgerError::Storage {
                reason: format!("record {} appended while locked", record.id),
            })
        }
    };
    println!("  New record:      refused ({})", refused);
    println!();

    drop(runtime);
    println!("  -- restart --");

    let restarted = HealthRuntime::open_reference(store, clock, authenticator)?;
    let restart_status = restarted.start_session()?;
    let lock_after_restart = restarted.lock().get_system_lock();
    println!("  Lock status:     {:?}", restart_status);
    println!(
        "  Lock reason:     {}",
        lock_after_restart.reason.as_deref().unwrap_or("(none)")
    );

    Ok(TamperOutcome {
        before,
        after,
        refused,
        restart_status,
        lock_after_restart,
    })
}

/// Run Scenario 3 on a fresh in-memory store shared across the restart.
pub fn run_scenario() -> LedgerResult<()> {
    println!("=== Scenario 3: Tamper, Breach, Lock, Restart ===");
    println!();

    let outcome = run(
        Arc::new(MemoryStore::new()),
        Arc::new(SystemClock),
        Arc::new(demo_authenticator()),
    )?;

    println!();
    println!(
        "  Breach detected and lock persisted:  {}",
        if !outcome.after.ok && outcome.lock_after_restart.locked { "YES" } else { "NO" }
    );
    println!();
    println!("  Scenario 3 complete.");
    println!();

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
