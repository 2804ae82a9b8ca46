//! Electronic signature service.
//!
//! The only place an `ElectronicSignature` is minted.  Every signature needs
//! a meaning the policy allows for the action type and a fresh re-auth token
//! bound to the signer.  The service stamps the signing time itself, so a
//! caller cannot backdate a signature.

use std::sync::Arc;

use tracing::{info, warn};

use bioledger_audit::{chain::compute_signature_hash, signature_hash_matches, AuditLedger};
use bioledger_contracts::{
    error::{LedgerError, LedgerResult},
    record::AuditRecord,
    signature::{ElectronicSignature, SignatureRequest},
};
use bioledger_core::traits::Clock;
use bioledger_policy::SigningPolicy;

use crate::reauth::{ReAuthGate, ReAuthToken};

pub struct SignatureService {
    ledger: Arc<AuditLedger>,
    policy: Arc<SigningPolicy>,
    gate: Arc<ReAuthGate>,
    clock: Arc<dyn Clock>,
}

impl SignatureService {
    pub fn new(
        ledger: Arc<AuditLedger>,
        policy: Arc<SigningPolicy>,
        gate: Arc<ReAuthGate>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger,
            policy,
            gate,
            clock,
        }
    }

    pub fn gate(&self) -> &Arc<ReAuthGate> {
        &self.gate
    }

    /// Mint a signature over `request.data_checksum`.
    ///
    /// Checks run in order: non-empty fields, meaning policy, then the
    /// token.  The token is only spent once the request itself is valid.
    ///
    /// # Errors
    ///
    /// - `SignaturePrecondition` for an empty signer, meaning or checksum.
    /// - `MeaningNotAllowed` when the policy does not list the meaning for
    ///   `request.action_type`.
    /// - `ReAuthRequired` for an unknown, spent, expired or mismatched token.
    pub fn create_electronic_signature(
        &self,
        request: SignatureRequest,
        token: ReAuthToken,
    ) -> LedgerResult<ElectronicSignature> {
        for (field, value) in [
            ("signer_id", &request.signer_id),
            ("meaning", &request.meaning),
            ("data_checksum", &request.data_checksum),
        ] {
            if value.trim().is_empty() {
                return Err(LedgerError::SignaturePrecondition {
                    reason: format!("{} must not be empty", field),
                });
            }
        }

        if !self.policy.is_meaning_allowed(request.action_type, &request.meaning) {
            warn!(
                signer_id = %request.signer_id,
                meaning = %request.meaning,
                action_type = %request.action_type,
                "signature meaning refused by policy"
            );
            return Err(LedgerError::MeaningNotAllowed {
                meaning: request.meaning,
                action_type: request.action_type.to_string(),
            });
        }

        self.gate
            .redeem(&token, &request.signer_id, request.re_auth_method)?;

        let signed_at_utc = self.clock.now();
        let signature_hash = compute_signature_hash(
            &request.data_checksum,
            &request.signer_id,
            &request.meaning,
            &signed_at_utc,
        );

        info!(
            signer_id = %request.signer_id,
            meaning = %request.meaning,
            %signed_at_utc,
            "electronic signature created"
        );

        Ok(ElectronicSignature {
            signer_id: request.signer_id,
            re_auth_method: request.re_auth_method,
            meaning: request.meaning,
            data_checksum: request.data_checksum,
            signed_at_utc,
            signature_hash,
        })
    }

    /// Create a signature and attach it to the record `record_id`.
    ///
    /// The request must name the record's own action type and data
    /// checksum.  Both are checked before the token is redeemed.
    pub fn sign_record(
        &self,
        record_id: &str,
        request: SignatureRequest,
        token: ReAuthToken,
    ) -> LedgerResult<AuditRecord> {
        let record = self
            .ledger
            .get_log()?
            .into_iter()
            .find(|r| r.id == record_id)
            .ok_or_else(|| LedgerError::RecordNotFound {
                record_id: record_id.to_string(),
            })?;

        if record.action_type != request.action_type {
            return Err(LedgerError::SignaturePrecondition {
                reason: format!(
                    "request names {} but record {} is {}",
                    request.action_type, record_id, record.action_type
                ),
            });
        }
        if record.data_checksum.as_deref() != Some(request.data_checksum.as_str()) {
            return Err(LedgerError::SignatureMismatch {
                record_id: record_id.to_string(),
                reason: "request covers a different data checksum than the record".to_string(),
            });
        }
        if record.is_signed() {
            return Err(LedgerError::AlreadySigned {
                record_id: record_id.to_string(),
            });
        }

        let signature = self.create_electronic_signature(request, token)?;
        self.ledger.attach_signature(record_id, signature)
    }

    /// Recompute the signature hash and compare.
    pub fn verify_signature(&self, signature: &ElectronicSignature) -> bool {
        signature_hash_matches(signature)
    }
}
