//! Persisted system lock state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether the application is locked after an integrity breach.
///
/// Once `locked` is true it stays true across restarts; only an explicit
/// administrative reset clears it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SystemLockState {
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// When the lock was engaged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<DateTime<Utc>>,
}

impl SystemLockState {
    pub fn unlocked() -> Self {
        Self::default()
    }

    pub fn locked(reason: impl Into<String>, ts: DateTime<Utc>) -> Self {
        Self {
            locked: true,
            reason: Some(reason.into()),
            ts: Some(ts),
        }
    }
}
