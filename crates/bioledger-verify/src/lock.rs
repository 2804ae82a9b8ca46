//! System lock controller.
//!
//! Two states, one transition:
//!
//!   Unlocked ──(report.ok == false)──▶ Locked
//!
//! Nothing in normal application flow moves back to `Unlocked`.  A persisted
//! lock is re-entered on load without re-running verification, so a breach
//! is never healed by restarting.  The controller only owns the state; the
//! application shell is responsible for blocking the UI and mutating calls
//! while locked.

use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};

use bioledger_contracts::{
    error::{LedgerError, LedgerResult},
    lock::SystemLockState,
    verify::ChainVerificationReport,
};
use bioledger_core::traits::{Clock, KvStore};

/// Store key the lock flag lives under unless configured otherwise.
pub const DEFAULT_LOCK_KEY: &str = "bioledger/system-lock/v1";

/// In-session lock status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    Unlocked,
    Locked,
}

/// Owns the system lock state and its persistence.
pub struct LockController {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    lock_key: String,
    state: Mutex<SystemLockState>,
}

impl LockController {
    /// Load the persisted lock state from the default key.
    pub fn load(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> LedgerResult<Self> {
        Self::load_with_key(store, clock, DEFAULT_LOCK_KEY)
    }

    /// Load the persisted lock state from `lock_key`.
    ///
    /// An unreadable persisted value is treated as locked.
    pub fn load_with_key(
        store: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        lock_key: impl Into<String>,
    ) -> LedgerResult<Self> {
        let lock_key = lock_key.into();
        let state = match store.read(&lock_key)? {
            None => SystemLockState::unlocked(),
            Some(bytes) => match serde_json::from_slice::<SystemLockState>(&bytes) {
                Ok(state) => state,
                Err(e) => {
                    error!(key = %lock_key, error = %e, "persisted lock state unreadable, failing closed");
                    SystemLockState::locked(
                        format!("persisted lock state unreadable: {}", e),
                        clock.now(),
                    )
                }
            },
        };

        if state.locked {
            warn!(
                reason = state.reason.as_deref().unwrap_or(""),
                "system lock re-entered from persisted state"
            );
        }

        Ok(Self {
            store,
            clock,
            lock_key,
            state: Mutex::new(state),
        })
    }

    fn state(&self) -> std::sync::MutexGuard<'_, SystemLockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn status(&self) -> LockStatus {
        if self.state().locked {
            LockStatus::Locked
        } else {
            LockStatus::Unlocked
        }
    }

    pub fn is_locked(&self) -> bool {
        self.status() == LockStatus::Locked
    }

    /// The current lock state, as the application shell reads it on load.
    pub fn get_system_lock(&self) -> SystemLockState {
        self.state().clone()
    }

    /// Feed a verification report to the controller.
    ///
    /// A failing report locks the system; the persisted write is the last
    /// step.  Passing reports and reports observed while already locked
    /// change nothing.
    ///
    /// # Errors
    ///
    /// `Storage` when the lock flag could not be persisted.  The session is
    /// locked regardless; the next start re-detects the breach.
    pub fn observe(&self, report: &ChainVerificationReport) -> LedgerResult<LockStatus> {
        let mut state = self.state();
        if state.locked {
            return Ok(LockStatus::Locked);
        }
        if report.ok {
            return Ok(LockStatus::Unlocked);
        }

        let locked = SystemLockState::locked(report.message.clone(), self.clock.now());
        *state = locked.clone();

        let encoded = serde_json::to_vec(&locked).map_err(|e| LedgerError::Storage {
            reason: format!("failed to encode lock state: {}", e),
        })?;
        self.store.write(&self.lock_key, &encoded)?;

        error!(
            reason = %report.message,
            key = %self.lock_key,
            "integrity breach: system locked"
        );
        Ok(LockStatus::Locked)
    }
}

/// Out-of-band administrative reset of the persisted lock flag.
///
/// Not reachable from normal application flow; only the operator CLI calls
/// it, after the breach has been exported for forensics.
pub fn administrative_reset(store: &dyn KvStore, lock_key: &str, operator_id: &str) -> LedgerResult<()> {
    if operator_id.trim().is_empty() {
        return Err(LedgerError::Config {
            reason: "administrative reset requires an operator id".to_string(),
        });
    }
    store.remove(lock_key)?;
    info!(operator_id = %operator_id, key = %lock_key, "system lock cleared by administrator");
    Ok(())
}
