//! Re-authentication gate.
//!
//! A signer re-proves their identity through an `Authenticator` and receives
//! a `ReAuthToken`.  The token is opaque, expires after the configured TTL,
//! is bound to the signer and the method used, and is accepted exactly once.
//! The gate keeps the issued tokens; a token it does not know is worthless.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use bioledger_audit::chain::sha256_hex;
use bioledger_contracts::{
    error::{LedgerError, LedgerResult},
    signature::ReAuthMethod,
};
use bioledger_core::traits::{Authenticator, Clock};

/// Proof of a recent successful re-authentication.
///
/// Not `Clone`: the only way to present it is to give it up.
pub struct ReAuthToken {
    value: String,
    signer_id: String,
    method: ReAuthMethod,
    expires_at: DateTime<Utc>,
}

impl ReAuthToken {
    pub fn signer_id(&self) -> &str {
        &self.signer_id
    }

    pub fn method(&self) -> ReAuthMethod {
        self.method
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl fmt::Debug for ReAuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReAuthToken")
            .field("signer_id", &self.signer_id)
            .field("method", &self.method)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct Issued {
    signer_id: String,
    method: ReAuthMethod,
    expires_at: DateTime<Utc>,
}

/// Issues and redeems `ReAuthToken`s.
pub struct ReAuthGate {
    authenticator: Arc<dyn Authenticator>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    issued: Mutex<HashMap<String, Issued>>,
}

impl ReAuthGate {
    pub fn new(authenticator: Arc<dyn Authenticator>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            authenticator,
            clock,
            ttl,
            issued: Mutex::new(HashMap::new()),
        }
    }

    /// Gate whose token lifetime is `ttl_secs` seconds, as read from
    /// `[signing] reauth_token_ttl_secs`.
    pub fn with_ttl_secs(
        authenticator: Arc<dyn Authenticator>,
        clock: Arc<dyn Clock>,
        ttl_secs: u64,
    ) -> Self {
        let ttl = i64::try_from(ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        Self::new(authenticator, clock, ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Tokens issued, not yet redeemed and not yet expired.
    pub fn outstanding(&self) -> usize {
        let now = self.clock.now();
        self.issued().values().filter(|t| t.expires_at >= now).count()
    }

    fn issued(&self) -> MutexGuard<'_, HashMap<String, Issued>> {
        self.issued.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Check `credential` for `signer_id` and issue a single-use token.
    ///
    /// # Errors
    ///
    /// `AuthenticationFailed` when the authenticator rejects the credential.
    /// Errors from the authenticator itself are passed through.
    pub fn reauthenticate(
        &self,
        signer_id: &str,
        method: ReAuthMethod,
        credential: &str,
    ) -> LedgerResult<ReAuthToken> {
        if !self.authenticator.authenticate(signer_id, method, credential)? {
            warn!(signer_id, method = %method, "re-authentication failed");
            return Err(LedgerError::AuthenticationFailed {
                signer_id: signer_id.to_string(),
            });
        }

        let now = self.clock.now();
        let expires_at = now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        let value = Uuid::new_v4().to_string();

        let mut issued = self.issued();
        issued.retain(|_, t| t.expires_at >= now);
        issued.insert(
            value.clone(),
            Issued {
                signer_id: signer_id.to_string(),
                method,
                expires_at,
            },
        );

        info!(signer_id, method = %method, %expires_at, "re-authentication token issued");
        Ok(ReAuthToken {
            value,
            signer_id: signer_id.to_string(),
            method,
            expires_at,
        })
    }

    /// Consume `token` for a signature by `signer_id` using `method`.
    ///
    /// The token is spent by being presented, even when the binding check
    /// then fails.
    ///
    /// # Errors
    ///
    /// `ReAuthRequired` when the token is unknown, already spent, expired,
    /// or bound to a different signer or method.
    pub fn redeem(&self, token: &ReAuthToken, signer_id: &str, method: ReAuthMethod) -> LedgerResult<()> {
        let Some(issued) = self.issued().remove(&token.value) else {
            return Err(reauth_required("token unknown or already used"));
        };

        if self.clock.now() > issued.expires_at {
            return Err(reauth_required("token expired"));
        }
        if issued.signer_id != signer_id {
            return Err(reauth_required(format!(
                "token was issued to '{}', not '{}'",
                issued.signer_id, signer_id
            )));
        }
        if issued.method != method {
            return Err(reauth_required(format!(
                "token was issued for {} re-authentication, not {}",
                issued.method, method
            )));
        }

        debug!(signer_id, method = %method, "re-authentication token redeemed");
        Ok(())
    }
}

fn reauth_required(reason: impl Into<String>) -> LedgerError {
    LedgerError::ReAuthRequired { reason: reason.into() }
}

/// Credential table held in memory, keyed by signer and method.
///
/// Only SHA-256 digests of the credentials are kept.
#[derive(Debug, Default)]
pub struct InMemoryAuthenticator {
    digests: HashMap<(String, ReAuthMethod), String>,
}

impl InMemoryAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(
        mut self,
        signer_id: impl Into<String>,
        method: ReAuthMethod,
        credential: &str,
    ) -> Self {
        self.digests
            .insert((signer_id.into(), method), sha256_hex(&[credential.as_bytes()]));
        self
    }
}

impl Authenticator for InMemoryAuthenticator {
    fn authenticate(&self, signer_id: &str, method: ReAuthMethod, credential: &str) -> LedgerResult<bool> {
        Ok(self
            .digests
            .get(&(signer_id.to_string(), method))
            .is_some_and(|digest| *digest == sha256_hex(&[credential.as_bytes()])))
    }
}
