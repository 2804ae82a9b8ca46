//! # bioledger-audit
//!
//! Append-only, SHA-256 hash-chained audit ledger for regulated health-record
//! actions.
//!
//! ## Overview
//!
//! Every regulated action is appended as an `AuditRecord` whose checksum
//! covers its canonicalized content and its predecessor's checksum.
//! Changing even a single byte of any stored record breaks the chain and is
//! detected by the chain verifier in `bioledger-verify`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use bioledger_audit::AuditLedger;
//! use bioledger_contracts::record::{ActionType, NewAuditEntry};
//! use bioledger_core::{MemoryStore, SystemClock};
//!
//! let ledger = AuditLedger::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock));
//! let record = ledger.append(NewAuditEntry::new("u1", ActionType::Create))?;
//! assert_eq!(record.prev_checksum, "GENESIS");
//! ```

pub mod canonical;
pub mod chain;
pub mod ledger;

pub use canonical::{canonicalize, canonicalize_record, checksum_of_data_record};
pub use chain::{compute_record_checksum, compute_signature_hash, signature_hash_matches};
pub use ledger::AuditLedger;

// ── Tests ─────────────────────────────────────────────────────────────────────
