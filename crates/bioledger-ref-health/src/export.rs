//! Flat CSV export of the audit trail.
//!
//! One row per record, in chain order.  Signature columns are empty for
//! unsigned records.  Timestamps are RFC 3339 UTC.

use chrono::SecondsFormat;

use bioledger_audit::{chain::format_signed_at, AuditLedger};
use bioledger_contracts::{
    error::{LedgerError, LedgerResult},
    record::AuditRecord,
};

pub const CSV_HEADER: [&str; 19] = [
    "id",
    "timestampUtc",
    "userId",
    "actionType",
    "recordType",
    "recordId",
    "reason",
    "oldVal",
    "newVal",
    "dataChecksum",
    "chainVersion",
    "prevChecksum",
    "checksum",
    "signerId",
    "reAuthMethod",
    "meaning",
    "signatureDataChecksum",
    "signedAtUtc",
    "signatureHash",
];

fn export_error(context: &str, e: impl std::fmt::Display) -> LedgerError {
    LedgerError::Export {
        reason: format!("{}: {}", context, e),
    }
}

fn row(record: &AuditRecord) -> Vec<String> {
    let opt = |v: &Option<String>| v.clone().unwrap_or_default();
    let mut row = vec![
        record.id.clone(),
        record
            .timestamp_utc
            .to_rfc3339_opts(SecondsFormat::AutoSi, true),
        record.user_id.clone(),
        record.action_type.to_string(),
        opt(&record.record_type),
        opt(&record.record_id),
        opt(&record.reason),
        record
            .old_val
            .as_ref()
            .map(|s| s.as_str().to_string())
            .unwrap_or_default(),
        record
            .new_val
            .as_ref()
            .map(|s| s.as_str().to_string())
            .unwrap_or_default(),
        opt(&record.data_checksum),
        record.chain_version.to_string(),
        record.prev_checksum.clone(),
        record.checksum.clone(),
    ];

    match &record.signature {
        Some(sig) => row.extend([
            sig.signer_id.clone(),
            sig.re_auth_method.to_string(),
            sig.meaning.clone(),
            sig.data_checksum.clone(),
            format_signed_at(&sig.signed_at_utc),
            sig.signature_hash.clone(),
        ]),
        None => row.extend(std::iter::repeat(String::new()).take(6)),
    }
    row
}

/// Render `records` as CSV with a header row.
pub fn export_csv(records: &[AuditRecord]) -> LedgerResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_HEADER)
        .map_err(|e| export_error("CSV header error", e))?;

    for record in records {
        wtr.write_record(row(record))
            .map_err(|e| export_error(&format!("CSV row error for record {}", record.id), e))?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| export_error("CSV flush error", e))?;
    String::from_utf8(bytes).map_err(|e| export_error("CSV encoding error", e))
}

/// Export the ledger's current snapshot.
pub fn export_ledger_csv(ledger: &AuditLedger) -> LedgerResult<String> {
    let records = ledger.get_log()?;
    tracing::info!(count = records.len(), "exporting audit trail as CSV");
    export_csv(&records)
}
