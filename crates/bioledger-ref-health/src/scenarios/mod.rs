//! Health dashboard demo scenarios.
//!
//! Each scenario wires the real bioledger components (ledger, verifier,
//! lock controller, signature service) through `HealthRuntime` with mock
//! dashboard data and walks through one audit-trail behaviour.

pub mod medication_intake;
pub mod refund_signoff;
pub mod tamper_lockdown;
