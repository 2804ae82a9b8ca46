//! Environment seams for the audit ledger.
//!
//! These three traits are everything the ledger consumes from its host:
//!
//! - `KvStore`:       the client-local persistent store
//! - `Clock`:         the source of every ledger-stamped timestamp
//! - `Authenticator`: the local re-authentication check before signing
//!
//! Ledger logic never reaches past them, so a browser-style local store, a
//! directory on disk, or an in-memory map are interchangeable.

use chrono::{DateTime, Utc};

use bioledger_contracts::{error::LedgerResult, signature::ReAuthMethod};

/// A synchronous key-value store with compare-and-set.
///
/// Values are written as whole units: a reader never observes a partially
/// written value.  The store is not assumed to be transactional beyond the
/// single-key `compare_and_set`.
pub trait KvStore: Send + Sync {
    /// Return the value under `key`, or `None` if absent.
    fn read(&self, key: &str) -> LedgerResult<Option<Vec<u8>>>;

    /// Unconditionally replace the value under `key`.
    fn write(&self, key: &str, value: &[u8]) -> LedgerResult<()>;

    /// Replace the value under `key` with `new` only if it currently equals
    /// `expected` (`None` meaning "absent").
    ///
    /// Returns `Ok(false)` without writing when the current value differs.
    fn compare_and_set(&self, key: &str, expected: Option<&[u8]>, new: &[u8])
        -> LedgerResult<bool>;

    /// Delete `key`.  Deleting an absent key is not an error.
    fn remove(&self, key: &str) -> LedgerResult<()>;
}

/// The wall clock the ledger stamps records and signatures with.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Verifies a credential presented during re-authentication.
///
/// This is a local gate, not identity proofing.  Implementations return
/// `Ok(false)` for a wrong credential and reserve `Err` for failures of the
/// check itself.
pub trait Authenticator: Send + Sync {
    fn authenticate(
        &self,
        signer_id: &str,
        method: ReAuthMethod,
        credential: &str,
    ) -> LedgerResult<bool>;
}
