//! # bioledger-ref-health
//!
//! Health dashboard reference runtime for the bioledger audit trail.
//!
//! Demonstrates three scenarios using mock data:
//!
//! 1. **Medication Intake Logging**: CREATE / READ / UPDATE records with
//!    value snapshots and data checksums, then detailed verification.
//! 2. **Refund Sign-off**: electronic signature with re-authentication,
//!    meaning policy and single-signature enforcement.
//! 3. **Tamper, Breach, Lock, Restart**: a rewritten record is pinpointed,
//!    the system locks, and the lock survives a restart.
//!
//! `export` renders the audit trail as flat CSV for offline review.
//!
//! All data is hardcoded and fictional. No external API calls are made.

pub mod export;
pub mod mock_data;
pub mod runtime;
pub mod scenarios;

pub use runtime::{HealthRuntime, REFERENCE_POLICY};

// ── Tests ─────────────────────────────────────────────────────────────────────
