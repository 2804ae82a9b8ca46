//! Application shell wiring.
//!
//! `HealthRuntime` is what the dashboard holds for the lifetime of a
//! session: one ledger, its verifier, the lock controller and the signature
//! service, all configured from a single `SigningPolicy`.  Mutations go
//! through `record` and `sign`, which refuse to run while the system is
//! locked.

use std::sync::Arc;

use tracing::{info, warn};

use bioledger_audit::AuditLedger;
use bioledger_contracts::{
    error::{LedgerError, LedgerResult},
    record::{AuditRecord, NewAuditEntry},
    signature::SignatureRequest,
    verify::ChainVerificationReport,
};
use bioledger_core::traits::{Authenticator, Clock, KvStore};
use bioledger_policy::SigningPolicy;
use bioledger_sign::{ReAuthGate, ReAuthToken, SignatureService};
use bioledger_verify::{ChainVerifier, LockController, LockStatus};

/// Embedded reference configuration.
pub const REFERENCE_POLICY: &str = include_str!("../policies/bioledger.toml");

pub struct HealthRuntime {
    store: Arc<dyn KvStore>,
    policy: Arc<SigningPolicy>,
    ledger: Arc<AuditLedger>,
    verifier: ChainVerifier,
    lock: LockController,
    signatures: SignatureService,
}

impl HealthRuntime {
    /// Wire every component over `store`.  Loads the persisted lock state
    /// but does not verify; call `start_session` for that.
    pub fn open(
        store: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        policy: SigningPolicy,
        authenticator: Arc<dyn Authenticator>,
    ) -> LedgerResult<Self> {
        let policy = Arc::new(policy);
        let settings = policy.ledger();

        let ledger = Arc::new(
            AuditLedger::new(Arc::clone(&store), Arc::clone(&clock))
                .with_store_key(settings.store_key.clone())
                .with_max_append_retries(settings.max_append_retries),
        );
        let verifier = ChainVerifier::new(Arc::clone(&ledger));
        let lock = LockController::load_with_key(
            Arc::clone(&store),
            Arc::clone(&clock),
            settings.lock_key.clone(),
        )?;
        let gate = Arc::new(ReAuthGate::with_ttl_secs(
            authenticator,
            Arc::clone(&clock),
            policy.signing().reauth_token_ttl_secs,
        ));
        let signatures = SignatureService::new(Arc::clone(&ledger), Arc::clone(&policy), gate, clock);

        Ok(Self {
            store,
            policy,
            ledger,
            verifier,
            lock,
            signatures,
        })
    }

    /// Open with the embedded reference configuration.
    pub fn open_reference(
        store: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        authenticator: Arc<dyn Authenticator>,
    ) -> LedgerResult<Self> {
        Self::open(store, clock, SigningPolicy::from_toml_str(REFERENCE_POLICY)?, authenticator)
    }

    /// Session start.  A persisted lock is honoured as-is; otherwise the
    /// whole chain is verified and the report decides.
    pub fn start_session(&self) -> LedgerResult<LockStatus> {
        if self.lock.is_locked() {
            warn!("session started while locked; verification skipped");
            return Ok(LockStatus::Locked);
        }
        let report = self.verifier.verify()?;
        info!(ok = report.ok, count = report.count, "session start verification");
        self.lock.observe(&report)
    }

    /// Verify on demand and feed the result to the lock.
    pub fn verify_now(&self) -> LedgerResult<ChainVerificationReport> {
        let report = self.verifier.verify_detailed()?;
        self.lock.observe(&report)?;
        Ok(report)
    }

    fn ensure_unlocked(&self) -> LedgerResult<()> {
        let state = self.lock.get_system_lock();
        if state.locked {
            return Err(LedgerError::SystemLocked {
                reason: state.reason.unwrap_or_else(|| "integrity breach".to_string()),
            });
        }
        Ok(())
    }

    /// Append an audit record for a regulated action.
    pub fn record(&self, entry: NewAuditEntry) -> LedgerResult<AuditRecord> {
        self.ensure_unlocked()?;
        self.ledger.append(entry)
    }

    /// Sign an existing record.
    pub fn sign(
        &self,
        record_id: &str,
        request: SignatureRequest,
        token: ReAuthToken,
    ) -> LedgerResult<AuditRecord> {
        self.ensure_unlocked()?;
        self.signatures.sign_record(record_id, request, token)
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    pub fn policy(&self) -> &SigningPolicy {
        &self.policy
    }

    pub fn ledger(&self) -> &Arc<AuditLedger> {
        &self.ledger
    }

    pub fn verifier(&self) -> &ChainVerifier {
        &self.verifier
    }

    pub fn lock(&self) -> &LockController {
        &self.lock
    }

    pub fn signatures(&self) -> &SignatureService {
        &self.signatures
    }

    pub fn gate(&self) -> &Arc<ReAuthGate> {
        self.signatures.gate()
    }
}
