//! Override Context — short-lived, session-scoped elevation grants.
//!
//! A grant lets a CONFIRM-tier action auto-execute once (or for a short
//! TTL). Grants are keyed by the originating session and never readable by
//! another session: the failure mode this module exists to prevent is a
//! single process-global "override active" flag racing across concurrent
//! sessions. Nothing here touches the Protected Resource Guard, and no
//! grant scope ever reaches FORBIDDEN.

use crate::error::GateError;
use crate::types::{SessionContext, Tier};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// A granted elevation, scoped to one session.
#[derive(Debug, Clone)]
pub struct OverrideGrant {
    pub session_id: String,
    pub granted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Highest tier this grant may elevate past confirmation. Capped at
    /// `Confirm` — a grant can never cover FORBIDDEN.
    pub max_tier: Tier,
    pub single_use: bool,
}

impl OverrideGrant {
    /// `now >= expires_at` counts as expired (fail-closed at the instant).
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Keyed store of active grants. Per-session isolation is the whole point:
/// `consume` only ever sees the grant belonging to the calling session.
pub struct OverrideStore {
    grants: Mutex<HashMap<String, OverrideGrant>>,
    secret: Option<String>,
    ttl: Duration,
    single_use: bool,
}

impl OverrideStore {
    /// `secret` is the elevation credential, distinct from session auth.
    /// `None` disables elevation entirely.
    pub fn new(secret: Option<String>, ttl_secs: i64, single_use: bool) -> Self {
        Self {
            grants: Mutex::new(HashMap::new()),
            secret: secret.filter(|s| !s.is_empty()),
            ttl: Duration::seconds(ttl_secs),
            single_use,
        }
    }

    /// Check the elevation credential and mint a grant for this session.
    /// The error never reveals whether the credential was close.
    pub fn grant(
        &self,
        session: &SessionContext,
        credential: &str,
    ) -> Result<OverrideGrant, GateError> {
        let Some(ref secret) = self.secret else {
            return Err(GateError::Auth);
        };
        if !constant_time_eq(secret.as_bytes(), credential.as_bytes()) {
            return Err(GateError::Auth);
        }

        let now = Utc::now();
        let grant = OverrideGrant {
            session_id: session.session_id.clone(),
            granted_at: now,
            expires_at: now + self.ttl,
            max_tier: Tier::Confirm,
            single_use: self.single_use,
        };

        let mut grants = self.grants.lock().expect("override store poisoned");
        grants.insert(session.session_id.clone(), grant.clone());
        Ok(grant)
    }

    /// Consume the calling session's grant for an action at `tier`.
    ///
    /// Returns true when a live, in-scope grant existed; single-use grants
    /// are removed on success. A FORBIDDEN tier never consumes anything.
    pub fn consume(&self, session_id: &str, tier: Tier) -> bool {
        if tier == Tier::Forbidden {
            return false;
        }

        let now = Utc::now();
        let mut grants = self.grants.lock().expect("override store poisoned");

        let Some(grant) = grants.get(session_id) else {
            return false;
        };
        if grant.is_expired(now) {
            grants.remove(session_id);
            return false;
        }
        if tier > grant.max_tier {
            return false;
        }
        if grant.single_use {
            grants.remove(session_id);
        }
        true
    }

    /// Number of live grants (test/diagnostic use).
    pub fn active_grants(&self) -> usize {
        self.grants.lock().expect("override store poisoned").len()
    }
}

#[cfg(test)]
impl OverrideStore {
    /// Seed a grant without a credential check (test use only).
    pub(crate) fn seed_grant(&self, session_id: &str) {
        let now = Utc::now();
        self.grants.lock().expect("override store poisoned").insert(
            session_id.to_string(),
            OverrideGrant {
                session_id: session_id.to_string(),
                granted_at: now,
                expires_at: now + Duration::seconds(300),
                max_tier: Tier::Confirm,
                single_use: true,
            },
        );
    }
}

/// Byte comparison that doesn't short-circuit on the first mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> OverrideStore {
        OverrideStore::new(Some("hunter2".to_string()), 300, true)
    }

    #[test]
    fn wrong_credential_rejected() {
        let s = store();
        let session = SessionContext::new("sess-a");
        assert!(s.grant(&session, "hunter3").is_err());
        assert_eq!(s.active_grants(), 0);
    }

    #[test]
    fn grant_and_consume_single_use() {
        let s = store();
        let session = SessionContext::new("sess-a");
        s.grant(&session, "hunter2").unwrap();

        assert!(s.consume("sess-a", Tier::Confirm));
        // Single use: second consume fails.
        assert!(!s.consume("sess-a", Tier::Confirm));
    }

    #[test]
    fn grant_never_covers_forbidden() {
        let s = store();
        let session = SessionContext::new("sess-a");
        s.grant(&session, "hunter2").unwrap();
        assert!(!s.consume("sess-a", Tier::Forbidden));
        // The grant was not consumed by the forbidden attempt.
        assert!(s.consume("sess-a", Tier::Confirm));
    }

    #[test]
    fn sessions_are_isolated() {
        let s = store();
        s.grant(&SessionContext::new("sess-a"), "hunter2").unwrap();
        assert!(!s.consume("sess-b", Tier::Confirm));
        assert!(s.consume("sess-a", Tier::Confirm));
    }

    #[test]
    fn expired_grant_not_consumable() {
        let s = OverrideStore::new(Some("hunter2".to_string()), 0, true);
        s.grant(&SessionContext::new("sess-a"), "hunter2").unwrap();
        // ttl of 0 seconds: expires_at == granted_at, and now >= expires_at.
        assert!(!s.consume("sess-a", Tier::Confirm));
    }

    #[test]
    fn disabled_store_grants_nothing() {
        let s = OverrideStore::new(None, 300, true);
        assert!(s.grant(&SessionContext::new("sess-a"), "").is_err());
    }
}
