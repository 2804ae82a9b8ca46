//! Simulated dashboard data for the bioledger reference runtime.
//!
//! All data in this module is hardcoded and fictional. No external systems are
//! contacted. The payloads stand in for what the dashboard's medication
//! tracker and support desk would hand to the audit ledger.

use serde_json::{json, Value};

use bioledger_contracts::{record::Snapshot, signature::ReAuthMethod};
use bioledger_sign::InMemoryAuthenticator;

// ── Medication tracker (mock) ─────────────────────────────────────────────────

/// Return the active medication schedule for a patient.
pub fn medication_schedule(patient_id: &str) -> Value {
    json!({
        "patientId": patient_id,
        "medications": [
            { "name": "Metformin",   "dose": "500 mg", "times": ["08:00", "20:00"] },
            { "name": "Lisinopril",  "dose": "10 mg",  "times": ["08:00"] },
            { "name": "Atorvastatin", "dose": "20 mg", "times": ["21:00"] }
        ],
        "lastReviewed": "2024-06-28"
    })
}

/// One logged medication intake.
pub fn intake_event(patient_id: &str, medication: &str, dose: &str, taken_at: &str) -> Value {
    json!({
        "patientId": patient_id,
        "medication": medication,
        "dose": dose,
        "takenAt": taken_at,
        "source": "manual-entry"
    })
}

// ── Support desk (mock) ───────────────────────────────────────────────────────

/// Return a customer-support ticket for a disputed device order.
pub fn support_ticket(ticket_id: &str) -> Value {
    json!({
        "ticketId": ticket_id,
        "customerId": "cust-5531",
        "orderId": "ord-88412",
        "item": "Wrist blood-pressure monitor",
        "amountCents": 6499,
        "currency": "USD",
        "status": "open",
        "complaint": "Device reports an error code on every second reading"
    })
}

/// The refund decision an agent records against a ticket.
pub fn refund_decision(ticket: &Value) -> Value {
    json!({
        "ticketId": ticket["ticketId"],
        "orderId": ticket["orderId"],
        "refundCents": ticket["amountCents"],
        "currency": ticket["currency"],
        "status": "refund-approved"
    })
}

// ── Credentials (mock) ────────────────────────────────────────────────────────

pub const PATIENT_ID: &str = "patient-204";
pub const PATIENT_USER: &str = "pt-204";
pub const SUPPORT_AGENT: &str = "cs-agent-ana";
pub const SUPPORT_AGENT_PASSWORD: &str = "tulip-harbor-42";

/// Authenticator preloaded with the demo's fictional signers.
pub fn demo_authenticator() -> InMemoryAuthenticator {
    InMemoryAuthenticator::new()
        .with_credential(SUPPORT_AGENT, ReAuthMethod::Password, SUPPORT_AGENT_PASSWORD)
        .with_credential("pharmacist-kim", ReAuthMethod::Biometric, "fp-template-kim-01")
}

/// Opaque snapshot of a JSON payload.
pub fn snapshot(value: &Value) -> Snapshot {
    Snapshot::new(value.to_string())
}
