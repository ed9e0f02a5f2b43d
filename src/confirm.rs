//! Confirmation workflow — the state machine between "proposed" and
//! "executed or rejected".
//!
//! States: Proposed → {Auto-Executed | Awaiting → (Approved → Executed |
//! Denied → Rejected | Expired → Rejected)}. This module owns the
//! Awaiting branch: a keyed store of pending confirmations, a notifier
//! seam toward the UI collaborator, and a scheduled timeout per entry
//! that fails closed to Rejected. Resolution is bound to the session that
//! created the pending entry.

use crate::audit::{AuditDecision, AuditLogger, AuditRecord};
use crate::error::GateError;
use crate::types::{SanitizedAction, SessionContext, Tier};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Lifecycle of a pending confirmation. Only `Awaiting` may transition;
/// the other three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationStatus {
    Awaiting,
    Approved,
    Denied,
    Expired,
}

/// A CONFIRM-tier action parked for human approval.
#[derive(Debug, Clone)]
pub struct PendingConfirmation {
    pub id: String,
    pub action: SanitizedAction,
    pub tier: Tier,
    pub rationale: Vec<String>,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: ConfirmationStatus,
}

impl PendingConfirmation {
    /// `now >= expires_at` counts as expired — fail-closed at the instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// One-line summary for prompts and notifications: enough context for
    /// a human to decide without reading logs.
    pub fn summary(&self) -> String {
        format!(
            "{} on {} (tier {}) — {}",
            self.action.action().name,
            self.action.action().targets.join(", "),
            self.tier,
            self.rationale.join("; ")
        )
    }
}

/// How a pending confirmation was resolved by a human.
#[derive(Debug, Clone)]
pub enum Resolution {
    Approved(PendingConfirmation),
    Denied(PendingConfirmation),
}

/// Seam toward the UI collaborator: surface a pending confirmation to a
/// human. Delivery mechanism (push vs poll) is the collaborator's concern.
#[async_trait]
pub trait ConfirmationNotifier {
    async fn notify(&self, pending: &PendingConfirmation) -> anyhow::Result<()>;
}

/// Default notifier: logs the pending request. Useful when the UI
/// collaborator polls instead of listening.
pub struct TracingNotifier;

#[async_trait]
impl ConfirmationNotifier for TracingNotifier {
    async fn notify(&self, pending: &PendingConfirmation) -> anyhow::Result<()> {
        tracing::warn!(
            confirmation_id = %pending.id,
            "awaiting human confirmation: {}",
            pending.summary()
        );
        Ok(())
    }
}

/// Called whenever an Awaiting entry transitions to Expired, whether by
/// timer or lazily at resolution. Lets the gateway keep its own view of
/// the request consistent with the terminal state.
pub type ExpiryHook = Arc<dyn Fn(&PendingConfirmation) + Send + Sync>;

/// How long terminal entries stay queryable before they are swept.
const TERMINAL_RETENTION: Duration = Duration::from_secs(3600);

/// The keyed pending store plus per-entry expiry scheduling.
pub struct ConfirmationWorkflow {
    pending: Arc<Mutex<HashMap<String, PendingConfirmation>>>,
    timeout: Duration,
    notifier: Arc<dyn ConfirmationNotifier + Send + Sync>,
    audit: Arc<Mutex<AuditLogger>>,
    expiry_hook: Option<ExpiryHook>,
    terminal_retention: Duration,
}

impl ConfirmationWorkflow {
    pub fn new(
        timeout: Duration,
        notifier: Arc<dyn ConfirmationNotifier + Send + Sync>,
        audit: Arc<Mutex<AuditLogger>>,
    ) -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            timeout,
            notifier,
            audit,
            expiry_hook: None,
            terminal_retention: TERMINAL_RETENTION,
        }
    }

    /// Install the expiry hook. Set once, at construction time.
    pub fn with_expiry_hook(mut self, hook: ExpiryHook) -> Self {
        self.expiry_hook = Some(hook);
        self
    }

    #[cfg(test)]
    fn set_terminal_retention(&mut self, retention: Duration) {
        self.terminal_retention = retention;
    }

    /// Park a CONFIRM-tier action and schedule its expiry. Emits the
    /// notification to the UI collaborator; a notifier failure is logged
    /// but does not lose the pending entry (the human can still poll).
    pub async fn create(
        &self,
        action: SanitizedAction,
        tier: Tier,
        rationale: Vec<String>,
        session: &SessionContext,
    ) -> PendingConfirmation {
        let now = Utc::now();
        let entry = PendingConfirmation {
            id: Uuid::new_v4().to_string(),
            action,
            tier,
            rationale,
            session_id: session.session_id.clone(),
            created_at: now,
            expires_at: now
                + chrono::Duration::from_std(self.timeout)
                    .unwrap_or_else(|_| chrono::Duration::seconds(300)),
            status: ConfirmationStatus::Awaiting,
        };

        {
            let mut map = self.pending.lock().await;
            // Sweep terminal entries past their retention; the store must
            // not grow for the life of the process.
            let retention = chrono::Duration::from_std(self.terminal_retention)
                .unwrap_or_else(|_| chrono::Duration::seconds(3600));
            map.retain(|_, e| {
                e.status == ConfirmationStatus::Awaiting || now < e.expires_at + retention
            });
            map.insert(entry.id.clone(), entry.clone());
        }

        if let Err(e) = self.notifier.notify(&entry).await {
            tracing::error!("confirmation notifier failed: {}", e);
        }

        self.spawn_expiry(entry.id.clone());
        entry
    }

    /// Schedule the fail-closed timeout: when the timer fires and the
    /// entry is still Awaiting, it transitions to Expired and the terminal
    /// audit record is written here (there is no request on the stack to
    /// write it).
    fn spawn_expiry(&self, id: String) {
        let pending = Arc::clone(&self.pending);
        let audit = Arc::clone(&self.audit);
        let hook = self.expiry_hook.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;

            let expired = {
                let mut map = pending.lock().await;
                match map.get_mut(&id) {
                    Some(entry) if entry.status == ConfirmationStatus::Awaiting => {
                        entry.status = ConfirmationStatus::Expired;
                        Some(entry.clone())
                    }
                    _ => None,
                }
            };

            if let Some(entry) = expired {
                let record = expiry_record(&entry);
                if let Err(e) = audit.lock().await.append(&record) {
                    tracing::error!("failed to write expiry audit record: {}", e);
                }
                if let Some(hook) = &hook {
                    hook(&entry);
                }
                tracing::warn!(
                    confirmation_id = %entry.id,
                    "pending confirmation expired unresolved — rejected"
                );
            }
        });
    }

    /// Resolve a pending confirmation by explicit approve/deny.
    ///
    /// The resolving session must match the one that created the entry.
    /// An entry at or past its expiry instant resolves to Expired →
    /// rejected regardless of the approve flag.
    pub async fn resolve(
        &self,
        confirmation_id: &str,
        approve: bool,
        session: &SessionContext,
    ) -> Result<Resolution, GateError> {
        let now = Utc::now();

        let (resolution, expired_entry) = {
            let mut map = self.pending.lock().await;
            let entry = map.get_mut(confirmation_id).ok_or_else(|| {
                GateError::Confirmation(format!("no pending confirmation '{}'", confirmation_id))
            })?;

            if entry.session_id != session.session_id {
                return Err(GateError::Confirmation(
                    "confirmation belongs to a different session".to_string(),
                ));
            }

            if entry.status != ConfirmationStatus::Awaiting {
                return Err(GateError::Confirmation(format!(
                    "confirmation already resolved ({:?})",
                    entry.status
                )));
            }

            if entry.is_expired(now) {
                // The timer may not have fired yet; fail closed here and
                // let the timer find the terminal status and skip.
                entry.status = ConfirmationStatus::Expired;
                (None, Some(entry.clone()))
            } else if approve {
                entry.status = ConfirmationStatus::Approved;
                (Some(Resolution::Approved(entry.clone())), None)
            } else {
                entry.status = ConfirmationStatus::Denied;
                (Some(Resolution::Denied(entry.clone())), None)
            }
        };

        if let Some(entry) = expired_entry {
            let record = expiry_record(&entry);
            self.audit
                .lock()
                .await
                .append(&record)
                .map_err(|e| GateError::Audit(e.to_string()))?;
            if let Some(hook) = &self.expiry_hook {
                hook(&entry);
            }
            return Err(GateError::Confirmation(format!(
                "confirmation '{}' expired before resolution",
                confirmation_id
            )));
        }

        Ok(resolution.expect("resolution set when not expired"))
    }

    /// Look up a pending entry (UI polling, tests).
    pub async fn get(&self, confirmation_id: &str) -> Option<PendingConfirmation> {
        self.pending.lock().await.get(confirmation_id).cloned()
    }

    /// Count of entries still awaiting resolution.
    pub async fn awaiting_count(&self) -> usize {
        self.pending
            .lock()
            .await
            .values()
            .filter(|e| e.status == ConfirmationStatus::Awaiting)
            .count()
    }
}

/// Terminal audit record for Expired → Rejected.
fn expiry_record(entry: &PendingConfirmation) -> AuditRecord {
    let action = entry.action.action();
    AuditRecord {
        timestamp: Utc::now(),
        request_id: action.request_id.clone(),
        session_id: entry.session_id.clone(),
        actor: action.actor,
        action: action.name.clone(),
        targets: action.targets.clone(),
        tier: Some(entry.tier),
        decision: AuditDecision::Rejected,
        outcome: None,
        rationale: format!(
            "confirmation '{}' expired unresolved — fail-closed to rejected",
            entry.id
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Action, ActionArgs, Actor};
    use tempfile::TempDir;

    fn sanitized(name: &str) -> SanitizedAction {
        SanitizedAction::new(Action {
            request_id: "req-1".into(),
            name: name.into(),
            targets: vec!["vm-101".into()],
            args: ActionArgs::default(),
            actor: Actor::Agent,
            remediation_rule: None,
        })
    }

    fn workflow(tmp: &TempDir, timeout: Duration) -> ConfirmationWorkflow {
        let audit = Arc::new(Mutex::new(
            AuditLogger::with_path(tmp.path().join("audit.jsonl")).unwrap(),
        ));
        ConfirmationWorkflow::new(timeout, Arc::new(TracingNotifier), audit)
    }

    #[tokio::test]
    async fn approve_transitions_once() {
        let tmp = TempDir::new().unwrap();
        let wf = workflow(&tmp, Duration::from_secs(300));
        let session = SessionContext::new("sess-a");

        let entry = wf
            .create(sanitized("host_reboot"), Tier::Confirm, vec![], &session)
            .await;
        assert_eq!(wf.awaiting_count().await, 1);

        let resolution = wf.resolve(&entry.id, true, &session).await.unwrap();
        assert!(matches!(resolution, Resolution::Approved(_)));

        // Second resolution attempt fails: already terminal.
        assert!(wf.resolve(&entry.id, true, &session).await.is_err());
    }

    #[tokio::test]
    async fn deny_is_terminal() {
        let tmp = TempDir::new().unwrap();
        let wf = workflow(&tmp, Duration::from_secs(300));
        let session = SessionContext::new("sess-a");

        let entry = wf
            .create(sanitized("host_reboot"), Tier::Confirm, vec![], &session)
            .await;
        let resolution = wf.resolve(&entry.id, false, &session).await.unwrap();
        assert!(matches!(resolution, Resolution::Denied(_)));
        assert_eq!(
            wf.get(&entry.id).await.unwrap().status,
            ConfirmationStatus::Denied
        );
    }

    #[tokio::test]
    async fn wrong_session_cannot_resolve() {
        let tmp = TempDir::new().unwrap();
        let wf = workflow(&tmp, Duration::from_secs(300));
        let session = SessionContext::new("sess-a");

        let entry = wf
            .create(sanitized("host_reboot"), Tier::Confirm, vec![], &session)
            .await;

        let other = SessionContext::new("sess-b");
        let err = wf.resolve(&entry.id, true, &other).await.unwrap_err();
        assert!(err.to_string().contains("different session"));

        // Still awaiting for the right session.
        assert!(wf.resolve(&entry.id, true, &session).await.is_ok());
    }

    #[tokio::test]
    async fn at_expiry_instant_resolves_expired_not_awaiting() {
        let tmp = TempDir::new().unwrap();
        let wf = workflow(&tmp, Duration::from_secs(0));
        let session = SessionContext::new("sess-a");

        let entry = wf
            .create(sanitized("host_reboot"), Tier::Confirm, vec![], &session)
            .await;

        // expires_at == created_at, so now >= expires_at: approve must fail
        // closed.
        let err = wf.resolve(&entry.id, true, &session).await;
        assert!(err.is_err());
        assert_eq!(
            wf.get(&entry.id).await.unwrap().status,
            ConfirmationStatus::Expired
        );
    }

    #[tokio::test]
    async fn timer_expires_unresolved_entry() {
        let tmp = TempDir::new().unwrap();
        let wf = workflow(&tmp, Duration::from_millis(50));
        let session = SessionContext::new("sess-a");

        let entry = wf
            .create(sanitized("host_reboot"), Tier::Confirm, vec![], &session)
            .await;

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(
            wf.get(&entry.id).await.unwrap().status,
            ConfirmationStatus::Expired
        );

        // Exactly one terminal record for the expiry.
        let content = std::fs::read_to_string(tmp.path().join("audit.jsonl")).unwrap();
        assert_eq!(content.trim().lines().count(), 1);
    }

    #[tokio::test]
    async fn expiry_hook_fires_when_timer_expires_entry() {
        let tmp = TempDir::new().unwrap();
        let fired = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&fired);
        let wf = workflow(&tmp, Duration::from_millis(50)).with_expiry_hook(Arc::new(
            move |entry: &PendingConfirmation| {
                sink.lock().unwrap().push(entry.id.clone());
            },
        ));
        let session = SessionContext::new("sess-a");

        let entry = wf
            .create(sanitized("host_reboot"), Tier::Confirm, vec![], &session)
            .await;

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(*fired.lock().unwrap(), vec![entry.id]);
    }

    #[tokio::test]
    async fn expiry_hook_fires_on_lazy_expiry_at_resolution() {
        let tmp = TempDir::new().unwrap();
        let fired = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&fired);
        let wf = workflow(&tmp, Duration::from_secs(0)).with_expiry_hook(Arc::new(
            move |entry: &PendingConfirmation| {
                sink.lock().unwrap().push(entry.id.clone());
            },
        ));
        let session = SessionContext::new("sess-a");

        let entry = wf
            .create(sanitized("host_reboot"), Tier::Confirm, vec![], &session)
            .await;

        // expires_at == created_at, so the resolve path expires it lazily.
        assert!(wf.resolve(&entry.id, true, &session).await.is_err());
        assert!(fired.lock().unwrap().contains(&entry.id));
    }

    #[tokio::test]
    async fn terminal_entries_swept_after_retention() {
        let tmp = TempDir::new().unwrap();
        let mut wf = workflow(&tmp, Duration::from_secs(0));
        wf.set_terminal_retention(Duration::from_secs(0));
        let session = SessionContext::new("sess-a");

        let first = wf
            .create(sanitized("host_reboot"), Tier::Confirm, vec![], &session)
            .await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            wf.get(&first.id).await.unwrap().status,
            ConfirmationStatus::Expired
        );

        // The next create sweeps terminal entries past retention.
        let second = wf
            .create(sanitized("host_reboot"), Tier::Confirm, vec![], &session)
            .await;
        assert!(wf.get(&first.id).await.is_none());
        assert!(wf.get(&second.id).await.is_some());
    }

    #[tokio::test]
    async fn unknown_id_rejected() {
        let tmp = TempDir::new().unwrap();
        let wf = workflow(&tmp, Duration::from_secs(300));
        let session = SessionContext::new("sess-a");
        assert!(wf.resolve("nope", true, &session).await.is_err());
    }
}
