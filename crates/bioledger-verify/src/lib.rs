//! # bioledger-verify
//!
//! Chain verification and the system lock it drives.
//!
//! - `ChainVerifier` recomputes every checksum and link and reports, per
//!   record, what was expected and what was found.
//! - `LockController` turns a failing report into a persisted,
//!   session-surviving lock.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let verifier = ChainVerifier::new(Arc::clone(&ledger));
//! let lock = LockController::load(store, clock)?;
//! if !lock.is_locked() {
//!     lock.observe(&verifier.verify()?)?;
//! }
//! ```

pub mod lock;
pub mod verifier;

pub use lock::{administrative_reset, LockController, LockStatus, DEFAULT_LOCK_KEY};
pub use verifier::{verify_records, ChainVerifier};

// ── Tests ─────────────────────────────────────────────────────────────────────
