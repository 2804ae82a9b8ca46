//! Chain verification report types.
//!
//! A report is the normal output of a verification run whether or not the
//! chain is intact.  `ok == false` is a breach, which the lock controller
//! turns into a persistent state; it is never surfaced as an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-record verification outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRecordResult {
    pub id: String,
    pub index: usize,
    pub timestamp_utc: DateTime<Utc>,

    /// Stored checksum equals the recomputed one.
    pub checksum_ok: bool,

    /// Stored `prev_checksum` equals the preceding record's recomputed checksum.
    pub prev_ok: bool,

    /// The checksum stored on the record.
    pub expected_checksum: String,

    /// The checksum recomputed from the record's content.
    pub actual_checksum: String,

    /// The preceding record's recomputed checksum (or `GENESIS`).
    pub expected_prev_checksum: String,

    /// The `prev_checksum` stored on the record.
    pub actual_prev_checksum: String,

    /// `None` for unsigned records.  Does not contribute to `ok`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_ok: Option<bool>,
}

impl VerifyRecordResult {
    pub fn passed(&self) -> bool {
        self.checksum_ok && self.prev_ok
    }
}

/// The result of walking the whole chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainVerificationReport {
    /// True only if every record passed both checks.
    pub ok: bool,
    pub message: String,
    /// Number of records verified.
    pub count: usize,
    /// Per-record results.  Empty for summary (non-detailed) runs.
    #[serde(default)]
    pub results: Vec<VerifyRecordResult>,
}

impl ChainVerificationReport {
    /// The earliest failing result.
    ///
    /// Later failures are consequences of this one, so this is the link an
    /// operator should investigate first.
    pub fn first_broken_link(&self) -> Option<&VerifyRecordResult> {
        self.results
            .iter()
            .filter(|r| !r.passed())
            .min_by_key(|r| r.index)
    }

    /// Summarise the breach for operator display.  `None` when the chain is intact.
    pub fn breach_summary(&self) -> Option<BreachSummary> {
        if self.ok {
            return None;
        }
        let failing_count = self.results.iter().filter(|r| !r.passed()).count();
        let first = self.first_broken_link();
        Some(BreachSummary {
            first_broken_index: first.map(|r| r.index),
            first_broken_id: first.map(|r| r.id.clone()),
            first_broken_timestamp: first.map(|r| r.timestamp_utc),
            failing_count,
        })
    }
}

/// Operator-facing digest of a failing report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreachSummary {
    /// `None` when the ledger could not be decoded at all.
    pub first_broken_index: Option<usize>,
    pub first_broken_id: Option<String>,
    pub first_broken_timestamp: Option<DateTime<Utc>>,
    pub failing_count: usize,
}
