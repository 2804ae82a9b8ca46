//! Chain verification.
//!
//! `ChainVerifier` walks a point-in-time snapshot of the ledger and checks
//! two things per record:
//!
//! 1. **Checksum**: the stored `checksum` equals the one recomputed from the
//!    record's content and its own stored `prev_checksum`.
//! 2. **Linkage**: the stored `prev_checksum` equals the checksum recomputed
//!    for the preceding record (or `GENESIS` at index 0).
//!
//! Every recomputation uses only the record's own stored fields, so a
//! failure never propagates.  Tampering with record `k` fails `k`'s checksum
//! and `k + 1`'s linkage and nothing after it; the smallest failing index is
//! the tampering point.
//!
//! The stored log is decoded one element at a time.  An element that no
//! longer fits the record format (an unknown action type, a malformed
//! timestamp) fails its own checksum check and nothing else.
//!
//! A failing chain is a normal report (`ok == false`), never an error.  Only
//! store I/O failures are returned as `Err`.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use bioledger_audit::{
    chain::{compute_record_checksum, signature_hash_matches},
    AuditLedger,
};
use bioledger_contracts::{
    error::{LedgerError, LedgerResult},
    record::{AuditRecord, GENESIS},
    verify::{ChainVerificationReport, VerifyRecordResult},
};

/// One stored element of the log.
enum Entry {
    Record(AuditRecord),
    Undecodable { raw: Value, reason: String },
}

impl Entry {
    fn decode(raw: Value) -> Self {
        match serde_json::from_value::<AuditRecord>(raw.clone()) {
            Ok(record) => Entry::Record(record),
            Err(e) => Entry::Undecodable {
                raw,
                reason: e.to_string(),
            },
        }
    }

    /// The `checksum` as stored, whether or not the element decodes.
    fn stored_checksum(&self) -> String {
        match self {
            Entry::Record(record) => record.checksum.clone(),
            Entry::Undecodable { raw, .. } => raw_str(raw, "checksum"),
        }
    }
}

fn raw_str(raw: &Value, field: &str) -> String {
    raw.get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Last fully verified prefix of the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Checkpoint {
    count: usize,
    tail_checksum: String,
}

/// Verifies the hash chain held by an `AuditLedger`.
pub struct ChainVerifier {
    ledger: Arc<AuditLedger>,
    checkpoint: Mutex<Option<Checkpoint>>,
}

impl ChainVerifier {
    pub fn new(ledger: Arc<AuditLedger>) -> Self {
        Self {
            ledger,
            checkpoint: Mutex::new(None),
        }
    }

    /// Full verification, summary only (`results` is empty).
    ///
    /// `ok`, `count` and `message` are identical to `verify_detailed()` on
    /// the same snapshot.
    pub fn verify(&self) -> LedgerResult<ChainVerificationReport> {
        let mut report = self.verify_detailed()?;
        report.results = Vec::new();
        Ok(report)
    }

    /// Full verification with one `VerifyRecordResult` per record.
    pub fn verify_detailed(&self) -> LedgerResult<ChainVerificationReport> {
        let entries = match self.snapshot()? {
            Ok(entries) => entries,
            Err(reason) => return Ok(self.undecodable(reason)),
        };

        let results = verify_entries(&entries, 0, GENESIS);
        let report = build_report(entries.len(), results, None);
        self.remember(&entries, &report);
        Ok(report)
    }

    /// Verify only the records appended since the last fully passing run.
    ///
    /// Falls back to full verification when there is no checkpoint or the
    /// checkpointed tail is no longer in place.  Tampering strictly before
    /// the checkpointed tail is only caught by a full run, which remains the
    /// default for security-sensitive reports.
    pub fn verify_incremental(&self) -> LedgerResult<ChainVerificationReport> {
        let checkpoint = self.lock_checkpoint()?.clone();
        let Some(checkpoint) = checkpoint else {
            return self.verify_detailed();
        };

        let entries = match self.snapshot()? {
            Ok(entries) => entries,
            Err(reason) => return Ok(self.undecodable(reason)),
        };

        let tail_intact = checkpoint.count <= entries.len()
            && match &entries[checkpoint.count - 1] {
                Entry::Record(tail) => {
                    tail.checksum == checkpoint.tail_checksum
                        && compute_record_checksum(tail)
                            .is_ok_and(|c| c == checkpoint.tail_checksum)
                }
                Entry::Undecodable { .. } => false,
            };
        if !tail_intact {
            warn!(
                checkpoint_count = checkpoint.count,
                current_count = entries.len(),
                "verified tail no longer in place, running full verification"
            );
            return self.verify_detailed();
        }

        let results = verify_entries(
            &entries[checkpoint.count..],
            checkpoint.count,
            &checkpoint.tail_checksum,
        );
        debug!(
            from_index = checkpoint.count,
            verified = results.len(),
            "incremental verification"
        );
        let report = build_report(entries.len(), results, Some(checkpoint.count));
        self.remember(&entries, &report);
        Ok(report)
    }

    /// Stored elements, or the reason the log is not a JSON array at all.
    fn snapshot(&self) -> LedgerResult<Result<Vec<Entry>, String>> {
        let store_key = self.ledger.store_key();
        let Some(bytes) = self.ledger.store().read(store_key)? else {
            return Ok(Ok(Vec::new()));
        };
        match serde_json::from_slice::<Vec<Value>>(&bytes) {
            Ok(elements) => Ok(Ok(elements.into_iter().map(Entry::decode).collect())),
            Err(e) => Ok(Err(format!("failed to decode '{}': {}", store_key, e))),
        }
    }

    fn undecodable(&self, reason: String) -> ChainVerificationReport {
        warn!(%reason, "ledger could not be decoded");
        if let Ok(mut checkpoint) = self.checkpoint.lock() {
            *checkpoint = None;
        }
        ChainVerificationReport {
            ok: false,
            message: format!("chain integrity breach: ledger could not be decoded ({})", reason),
            count: 0,
            results: Vec::new(),
        }
    }

    fn lock_checkpoint(&self) -> LedgerResult<std::sync::MutexGuard<'_, Option<Checkpoint>>> {
        self.checkpoint.lock().map_err(|e| LedgerError::Storage {
            reason: format!("verifier checkpoint lock poisoned: {}", e),
        })
    }

    fn remember(&self, entries: &[Entry], report: &ChainVerificationReport) {
        let next = match entries.last() {
            Some(last) if report.ok => Some(Checkpoint {
                count: entries.len(),
                tail_checksum: last.stored_checksum(),
            }),
            _ => None,
        };
        if let Ok(mut checkpoint) = self.checkpoint.lock() {
            *checkpoint = next;
        }
    }
}

/// Verify `records`, the first of which sits at `start_index` and must link
/// to `expected_prev`.
pub fn verify_records(
    records: &[AuditRecord],
    start_index: usize,
    expected_prev: &str,
) -> Vec<VerifyRecordResult> {
    let entries: Vec<Entry> = records.iter().cloned().map(Entry::Record).collect();
    verify_entries(&entries, start_index, expected_prev)
}

fn verify_entries(
    entries: &[Entry],
    start_index: usize,
    expected_prev: &str,
) -> Vec<VerifyRecordResult> {
    let mut expected_prev = expected_prev.to_string();
    let mut results = Vec::with_capacity(entries.len());

    for (offset, entry) in entries.iter().enumerate() {
        let index = start_index + offset;
        let (result, actual_checksum) = match entry {
            Entry::Record(record) => check_record(record, index, expected_prev),
            Entry::Undecodable { raw, reason } => {
                warn!(index, %reason, "stored element no longer fits the record format");
                let timestamp_utc = raw
                    .get("timestampUtc")
                    .cloned()
                    .and_then(|v| serde_json::from_value::<DateTime<Utc>>(v).ok())
                    .unwrap_or_default();
                let actual_prev_checksum = raw_str(raw, "prevChecksum");
                let result = VerifyRecordResult {
                    id: raw_str(raw, "id"),
                    index,
                    timestamp_utc,
                    checksum_ok: false,
                    prev_ok: actual_prev_checksum == expected_prev,
                    expected_checksum: raw_str(raw, "checksum"),
                    actual_checksum: String::new(),
                    expected_prev_checksum: expected_prev,
                    actual_prev_checksum,
                    signature_ok: None,
                };
                (result, String::new())
            }
        };
        results.push(result);

        // Nothing recomputable: link against the stored value instead.
        expected_prev = if actual_checksum.is_empty() {
            entry.stored_checksum()
        } else {
            actual_checksum
        };
    }

    results
}

/// Check one decoded record; also returns the recomputed checksum.
fn check_record(
    record: &AuditRecord,
    index: usize,
    expected_prev: String,
) -> (VerifyRecordResult, String) {
    let actual_checksum = match compute_record_checksum(record) {
        Ok(checksum) => checksum,
        Err(e) => {
            warn!(index, id = %record.id, error = %e, "record checksum could not be recomputed");
            String::new()
        }
    };

    let signature_ok = record.signature.as_ref().map(|signature| {
        signature_hash_matches(signature)
            && record.data_checksum.as_deref() == Some(signature.data_checksum.as_str())
    });

    let result = VerifyRecordResult {
        id: record.id.clone(),
        index,
        timestamp_utc: record.timestamp_utc,
        checksum_ok: !actual_checksum.is_empty() && actual_checksum == record.checksum,
        prev_ok: record.prev_checksum == expected_prev,
        expected_checksum: record.checksum.clone(),
        actual_checksum: actual_checksum.clone(),
        expected_prev_checksum: expected_prev,
        actual_prev_checksum: record.prev_checksum.clone(),
        signature_ok,
    };
    (result, actual_checksum)
}

fn build_report(
    count: usize,
    results: Vec<VerifyRecordResult>,
    incremental_from: Option<usize>,
) -> ChainVerificationReport {
    let failing: Vec<&VerifyRecordResult> = results.iter().filter(|r| !r.passed()).collect();
    let ok = failing.is_empty();
    let scope = match incremental_from {
        Some(from) => format!(" (incremental from index {})", from),
        None => String::new(),
    };

    let message = match failing.first() {
        None => format!("chain intact: {} record(s) verified{}", count, scope),
        Some(first) => format!(
            "chain integrity breach: {} of {} record(s) failed{}; first broken link at index {} (record {})",
            failing.len(),
            count,
            scope,
            first.index,
            first.id
        ),
    };

    if ok {
        info!(count, "audit chain verified");
    } else {
        warn!(count, failing = failing.len(), %message, "audit chain breach detected");
    }

    ChainVerificationReport {
        ok,
        message,
        count,
        results,
    }
}
