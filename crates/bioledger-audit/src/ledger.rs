//! The append-only audit ledger.
//!
//! `AuditLedger` keeps the whole chain as one JSON array under a single store
//! key.  Every mutation is a read-modify-compare-and-set loop: the value read
//! at the start of the attempt is the CAS expectation, so if another writer
//! moved the tail in between, the commit is rejected and the attempt is
//! rebuilt on the fresh tail instead of forking the chain.
//!
//! Records are never updated or deleted.  The single exception is
//! `attach_signature`, which may add a signature to a record exactly once.

use std::sync::Arc;

use tracing::{debug, info, warn};

use bioledger_contracts::{
    error::{LedgerError, LedgerResult},
    record::{AuditRecord, ChainTail, NewAuditEntry, CURRENT_CHAIN_VERSION, GENESIS},
    signature::ElectronicSignature,
};
use bioledger_core::traits::{Clock, KvStore};

use crate::chain::{compute_record_checksum, signature_hash_matches};

/// Store key the ledger lives under unless configured otherwise.
pub const DEFAULT_STORE_KEY: &str = "bioledger/audit/v1";

/// Commit attempts before an append gives up with `AppendConflict`.
pub const DEFAULT_MAX_APPEND_RETRIES: u32 = 8;

/// A raw snapshot: the exact stored bytes (the CAS expectation) and the
/// records decoded from them.
struct Snapshot {
    raw: Option<Vec<u8>>,
    records: Vec<AuditRecord>,
}

/// The hash-chained, append-only audit ledger.
///
/// # Thread safety
///
/// All state lives in the `KvStore`; the ledger holds no in-memory tail.
/// Any number of `AuditLedger` values (in one process or several) may share
/// a store as long as the store's `compare_and_set` is atomic.
pub struct AuditLedger {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    store_key: String,
    max_append_retries: u32,
}

impl AuditLedger {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            store_key: DEFAULT_STORE_KEY.to_string(),
            max_append_retries: DEFAULT_MAX_APPEND_RETRIES,
        }
    }

    pub fn with_store_key(mut self, store_key: impl Into<String>) -> Self {
        self.store_key = store_key.into();
        self
    }

    /// Values below 1 are treated as 1.
    pub fn with_max_append_retries(mut self, max_append_retries: u32) -> Self {
        self.max_append_retries = max_append_retries.max(1);
        self
    }

    pub fn store_key(&self) -> &str {
        &self.store_key
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    fn load(&self) -> LedgerResult<Snapshot> {
        let raw = self.store.read(&self.store_key)?;
        let records = match &raw {
            None => Vec::new(),
            Some(bytes) => serde_json::from_slice(bytes).map_err(|e| LedgerError::CorruptLog {
                reason: format!("failed to decode '{}': {}", self.store_key, e),
            })?,
        };
        Ok(Snapshot { raw, records })
    }

    fn encode(records: &[AuditRecord]) -> LedgerResult<Vec<u8>> {
        serde_json::to_vec(records).map_err(|e| LedgerError::Storage {
            reason: format!("failed to encode ledger: {}", e),
        })
    }

    fn commit(&self, expected: Option<&[u8]>, records: &[AuditRecord]) -> LedgerResult<bool> {
        let encoded = Self::encode(records)?;
        self.store
            .compare_and_set(&self.store_key, expected, &encoded)
    }

    /// Append a regulated action to the chain and return the stored record.
    ///
    /// Assigns `id` and `timestamp_utc`, links the record to the current tail
    /// (or `GENESIS`), seals it with its chain checksum, and commits it as
    /// the new tail.  The action must not be treated as recorded until this
    /// returns `Ok`.
    ///
    /// # Errors
    ///
    /// - `Storage` when the store fails.
    /// - `CorruptLog` when the stored ledger cannot be decoded; nothing is
    ///   written on top of an undecodable ledger.
    /// - `Canonicalization` when the entry cannot be canonicalized.
    /// - `AppendConflict` when the tail moved on every attempt.
    pub fn append(&self, entry: NewAuditEntry) -> LedgerResult<AuditRecord> {
        for attempt in 1..=self.max_append_retries {
            let Snapshot { raw, mut records } = self.load()?;
            let prev_checksum = records
                .last()
                .map(|r| r.checksum.clone())
                .unwrap_or_else(|| GENESIS.to_string());

            let mut record = AuditRecord {
                id: uuid::Uuid::new_v4().to_string(),
                timestamp_utc: self.clock.now(),
                user_id: entry.user_id.clone(),
                action_type: entry.action_type,
                record_type: entry.record_type.clone(),
                record_id: entry.record_id.clone(),
                reason: entry.reason.clone(),
                old_val: entry.old_val.clone(),
                new_val: entry.new_val.clone(),
                data_checksum: entry.data_checksum.clone(),
                chain_version: CURRENT_CHAIN_VERSION,
                prev_checksum,
                checksum: String::new(),
                signature: None,
            };
            record.checksum = compute_record_checksum(&record)?;

            records.push(record.clone());
            if self.commit(raw.as_deref(), &records)? {
                info!(
                    id = %record.id,
                    index = records.len() - 1,
                    user_id = %record.user_id,
                    action_type = %record.action_type,
                    checksum = %record.checksum,
                    "audit record appended"
                );
                return Ok(record);
            }

            warn!(
                attempt,
                max_attempts = self.max_append_retries,
                "ledger tail moved during append, retrying on fresh tail"
            );
        }

        Err(LedgerError::AppendConflict {
            attempts: self.max_append_retries,
        })
    }

    /// Point-in-time snapshot of every record, oldest first.
    pub fn get_log(&self) -> LedgerResult<Vec<AuditRecord>> {
        Ok(self.load()?.records)
    }

    /// Record count and tail checksum.
    pub fn tail(&self) -> LedgerResult<ChainTail> {
        let records = self.load()?.records;
        Ok(match records.last() {
            None => ChainTail::genesis(),
            Some(last) => ChainTail {
                count: records.len(),
                checksum: last.checksum.clone(),
            },
        })
    }

    /// Attach an electronic signature to the record with id `record_id`.
    ///
    /// Allowed once per record.  The signature must cover the record's own
    /// `data_checksum`, its hash must match its contents, and it must not
    /// already be attached elsewhere.  The record's chain `checksum` is left
    /// untouched.
    ///
    /// Concurrent attempts on the same record are serialized by the store's
    /// compare-and-set: the loser re-reads, sees the signature, and fails
    /// with `AlreadySigned`.
    pub fn attach_signature(
        &self,
        record_id: &str,
        signature: ElectronicSignature,
    ) -> LedgerResult<AuditRecord> {
        if !signature_hash_matches(&signature) {
            return Err(LedgerError::SignatureMismatch {
                record_id: record_id.to_string(),
                reason: "signature hash does not match its contents".to_string(),
            });
        }

        for attempt in 1..=self.max_append_retries {
            let Snapshot { raw, mut records } = self.load()?;

            let index = records
                .iter()
                .position(|r| r.id == record_id)
                .ok_or_else(|| LedgerError::RecordNotFound {
                    record_id: record_id.to_string(),
                })?;

            if records[index].is_signed() {
                return Err(LedgerError::AlreadySigned {
                    record_id: record_id.to_string(),
                });
            }

            match records[index].data_checksum.as_deref() {
                Some(checksum) if checksum == signature.data_checksum => {}
                Some(_) => {
                    return Err(LedgerError::SignatureMismatch {
                        record_id: record_id.to_string(),
                        reason: "signature covers a different data checksum".to_string(),
                    })
                }
                None => {
                    return Err(LedgerError::SignatureMismatch {
                        record_id: record_id.to_string(),
                        reason: "record carries no data checksum to sign".to_string(),
                    })
                }
            }

            if let Some(other) = records.iter().find(|r| {
                r.signature
                    .as_ref()
                    .is_some_and(|s| s.signature_hash == signature.signature_hash)
            }) {
                return Err(LedgerError::SignatureReused {
                    signature_hash: signature.signature_hash.clone(),
                    record_id: other.id.clone(),
                });
            }

            records[index].signature = Some(signature.clone());
            if self.commit(raw.as_deref(), &records)? {
                let updated = records.swap_remove(index);
                info!(
                    id = %updated.id,
                    index,
                    signer_id = %signature.signer_id,
                    meaning = %signature.meaning,
                    "electronic signature attached"
                );
                return Ok(updated);
            }

            debug!(attempt, record_id, "ledger changed during signature attach, retrying");
        }

        Err(LedgerError::AppendConflict {
            attempts: self.max_append_retries,
        })
    }
}
