//! Execution Gateway — the single choke point every proposed action goes
//! through.
//!
//! Fixed pipeline order per submission: duplicate replay, sanitize,
//! protected-resource guard, tier classification, guardrails (autonomous
//! only), then tier-appropriate dispatch. The audit record is written
//! before the decision is reported; if the record cannot be written the
//! submission fails closed.
//!
//! Nothing outside this module executes anything. The executor seam is the
//! only way out.

pub mod client;
pub mod protocol;
pub mod server;

use crate::audit::{AuditDecision, AuditLogger, AuditRecord};
use crate::classify::TierClassifier;
use crate::config::GatewayConfig;
use crate::confirm::{ConfirmationNotifier, ConfirmationWorkflow, PendingConfirmation, Resolution};
use crate::elevate::{OverrideGrant, OverrideStore};
use crate::error::GateError;
use crate::executor::Executor;
use crate::guard::{ProtectedEntry, ProtectedResourceGuard};
use crate::guardrail::{GuardrailSet, GuardrailVerdict};
use crate::registry::ActionRegistry;
use crate::sanitize::Sanitizer;
use crate::types::{Action, Decision, SanitizedAction, SessionContext, Tier};
use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};

/// How long a decided request id keeps replaying its decision before the
/// cache forgets it. At-least-once transports retry within seconds, not
/// hours.
const REPLAY_RETENTION: Duration = Duration::from_secs(3600);

/// State of a request id in the idempotence cache.
///
/// The slot is inserted as `InFlight` under the lock before the pipeline
/// runs, so a concurrent resubmission of the same id can never start a
/// second pipeline: it either replays the decision or awaits the channel.
enum Slot {
    InFlight(watch::Receiver<Option<Decision>>),
    Decided { decision: Decision, at: Instant },
}

enum Reservation {
    /// This caller owns the pipeline; fulfill the sender when decided.
    Owner(watch::Sender<Option<Decision>>),
    /// Another submission with this id is mid-pipeline; await its decision.
    Wait(watch::Receiver<Option<Decision>>),
    /// The id was already decided; replay.
    Replay(Decision),
}

/// The orchestrator. Built once from config, shared across connections.
pub struct ExecutionGateway {
    registry: Arc<ActionRegistry>,
    guard: ProtectedResourceGuard,
    classifier: TierClassifier,
    sanitizer: Sanitizer,
    overrides: OverrideStore,
    confirmations: ConfirmationWorkflow,
    guardrails: GuardrailSet,
    audit: Arc<Mutex<AuditLogger>>,
    executor: Arc<dyn Executor + Send + Sync>,
    execution_timeout: Duration,
    /// Idempotence cache keyed by request id.
    seen: Arc<StdMutex<HashMap<String, Slot>>>,
    replay_retention: Duration,
}

impl ExecutionGateway {
    pub fn new(
        config: &GatewayConfig,
        audit: AuditLogger,
        executor: Arc<dyn Executor + Send + Sync>,
        notifier: Arc<dyn ConfirmationNotifier + Send + Sync>,
    ) -> Result<Self> {
        let registry = Arc::new(
            ActionRegistry::new(config.actions.clone()).context("Invalid action registry")?,
        );

        let declared = config
            .protected
            .iter()
            .map(|p| ProtectedEntry::new(&p.pattern, &p.reason))
            .collect::<Result<Vec<_>>>()
            .context("Invalid protected-resource pattern")?;
        let guard = ProtectedResourceGuard::new(declared, &config.self_host, &config.quorum_peers)
            .context("Failed to build protected-resource guard")?;

        let classifier = TierClassifier::new(Arc::clone(&registry), &config.control_hosts)
            .context("Failed to compile control-host patterns")?;

        let sanitizer = Sanitizer::new(
            Arc::clone(&registry),
            config.sanitizer.base_dirs.clone(),
            config.sanitizer.allowed_commands.iter().cloned().collect(),
            config.sanitizer.max_payload_bytes,
            config.sanitizer.max_duration_secs,
        );

        let overrides = OverrideStore::new(
            config.override_secret(),
            config.override_grants.ttl_secs,
            config.override_grants.single_use,
        );

        let audit = Arc::new(Mutex::new(audit));
        let seen: Arc<StdMutex<HashMap<String, Slot>>> =
            Arc::new(StdMutex::new(HashMap::new()));

        // When a pending confirmation expires, the cached Pending decision
        // for its request id turns terminal: replays report the rejection,
        // not a confirmation id that no longer accepts resolution.
        let seen_at_expiry = Arc::clone(&seen);
        let confirmations = ConfirmationWorkflow::new(
            Duration::from_secs(config.confirmation_timeout_secs),
            notifier,
            Arc::clone(&audit),
        )
        .with_expiry_hook(Arc::new(move |entry: &PendingConfirmation| {
            let decision = Decision::Rejected {
                reason: format!("confirmation '{}' expired unresolved", entry.id),
            };
            seen_at_expiry
                .lock()
                .expect("decision cache poisoned")
                .insert(
                    entry.action.action().request_id.clone(),
                    Slot::Decided {
                        decision,
                        at: Instant::now(),
                    },
                );
        }));

        let guardrails = GuardrailSet::new(
            config.guardrails.rate_limit,
            Duration::from_secs(config.guardrails.rate_window_secs),
            config.guardrails.kill_switch,
        );

        Ok(Self {
            registry,
            guard,
            classifier,
            sanitizer,
            overrides,
            confirmations,
            guardrails,
            audit,
            executor,
            execution_timeout: Duration::from_secs(config.execution_timeout_secs),
            seen,
            replay_retention: REPLAY_RETENTION,
        })
    }

    /// Submit a proposed action and drive it to a decision.
    ///
    /// The request id is reserved in the idempotence cache before the
    /// pipeline runs. A duplicate id submitted while the first is still
    /// mid-pipeline awaits that decision instead of starting a second one,
    /// so exactly one execution and one audit record exist per id.
    pub async fn submit(&self, action: Action, session: &SessionContext) -> Result<Decision> {
        let request_id = action.request_id.clone();
        match self.reserve(&request_id) {
            Reservation::Replay(prior) => {
                tracing::info!(
                    request_id = %request_id,
                    "duplicate request id — replaying prior decision"
                );
                Ok(prior)
            }
            Reservation::Wait(mut rx) => {
                tracing::info!(
                    request_id = %request_id,
                    "duplicate request id — original still in flight, awaiting its decision"
                );
                let decision = rx
                    .wait_for(|d| d.is_some())
                    .await
                    .map_err(|_| {
                        anyhow::anyhow!(
                            "original submission of request '{}' failed before a decision",
                            request_id
                        )
                    })?
                    .clone()
                    .expect("fulfilled reservation carries a decision");
                Ok(decision)
            }
            Reservation::Owner(tx) => {
                let result = self.decide(action, session).await;
                let mut seen = self.seen.lock().expect("decision cache poisoned");
                match &result {
                    Ok(decision) => {
                        // A confirmation expiry may have recorded a
                        // terminal decision for this id already; keep it.
                        let prior = match seen.get(&request_id) {
                            Some(Slot::Decided { decision, .. }) => Some(decision.clone()),
                            _ => None,
                        };
                        let recorded = prior.unwrap_or_else(|| {
                            seen.insert(
                                request_id.clone(),
                                Slot::Decided {
                                    decision: decision.clone(),
                                    at: Instant::now(),
                                },
                            );
                            decision.clone()
                        });
                        let _ = tx.send(Some(recorded));
                    }
                    // Dropping the reservation closes the channel; waiters
                    // get an error rather than hanging, and the id becomes
                    // submittable again.
                    Err(_) => {
                        seen.remove(&request_id);
                    }
                }
                result
            }
        }
    }

    /// The decision pipeline proper: sanitize, guard, classify, guardrail,
    /// then tier-appropriate dispatch.
    ///
    /// Every return path below leaves exactly one audit record (the
    /// pending path leaves its terminal record later, at resolution or
    /// expiry).
    async fn decide(&self, action: Action, session: &SessionContext) -> Result<Decision> {
        let sanitized = match self.sanitizer.sanitize(action.clone()).await {
            Ok(s) => s,
            Err(e) => {
                return self
                    .reject(&action, session, None, AuditDecision::Rejected, e.reason())
                    .await;
            }
        };
        let action = sanitized.action().clone();

        if let Err(e) = self.guard.check_all(&action.targets) {
            return self
                .reject(&action, session, None, AuditDecision::Rejected, e.reason())
                .await;
        }

        let classification = self.classifier.classify(&sanitized);
        let tier = classification.tier;
        let rationale = classification.rationale.join("; ");

        if tier == Tier::Forbidden {
            return self
                .reject(&action, session, Some(tier), AuditDecision::Rejected, rationale)
                .await;
        }

        if action.actor.is_unattended() {
            let rule_id = action
                .remediation_rule
                .as_deref()
                .unwrap_or(action.name.as_str());
            if let GuardrailVerdict::Blocked(reason) =
                self.guardrails.check(rule_id, action.blast_radius())
            {
                return self
                    .reject(&action, session, Some(tier), AuditDecision::Blocked, reason)
                    .await;
            }
        }

        match tier {
            Tier::Observe | Tier::Notify => {
                self.execute_and_record(&sanitized, tier, session, rationale)
                    .await
            }
            Tier::Confirm => {
                if self.overrides.consume(&session.session_id, tier) {
                    let rationale = format!("{}; override grant consumed", rationale);
                    tracing::warn!(
                        request_id = %action.request_id,
                        "confirm-tier action auto-executing under an override grant"
                    );
                    return self
                        .execute_and_record(&sanitized, tier, session, rationale)
                        .await;
                }

                let pending = self
                    .confirmations
                    .create(sanitized, tier, classification.rationale, session)
                    .await;

                let mut record =
                    base_record(&action, session, Some(tier), AuditDecision::Pending);
                record.rationale = format!(
                    "{}; awaiting human confirmation '{}'",
                    rationale, pending.id
                );
                self.append_audit(record).await?;

                Ok(Decision::Pending {
                    confirmation_id: pending.id,
                })
            }
            Tier::Forbidden => unreachable!("forbidden handled above"),
        }
    }

    /// Resolve a pending confirmation on behalf of a human.
    ///
    /// A cancellation is a denial: anything other than an explicit approve
    /// ends in rejection.
    pub async fn resolve_confirmation(
        &self,
        confirmation_id: &str,
        approve: bool,
        session: &SessionContext,
    ) -> Result<Decision> {
        let resolution = self
            .confirmations
            .resolve(confirmation_id, approve, session)
            .await?;

        match resolution {
            Resolution::Approved(entry) => {
                let rationale = format!("approved by human (confirmation '{}')", entry.id);
                let decision = self
                    .execute_and_record(&entry.action, entry.tier, session, rationale)
                    .await?;
                self.record_decision(&entry.action.action().request_id, &decision);
                Ok(decision)
            }
            Resolution::Denied(entry) => {
                let action = entry.action.action();
                let reason = format!("denied by human (confirmation '{}')", entry.id);
                let mut record =
                    base_record(action, session, Some(entry.tier), AuditDecision::Rejected);
                record.rationale = reason.clone();
                self.append_audit(record).await?;

                let decision = Decision::Rejected { reason };
                self.record_decision(&action.request_id, &decision);
                Ok(decision)
            }
        }
    }

    /// Check the elevation credential and mint a session-scoped override
    /// grant.
    pub fn request_override(
        &self,
        session: &SessionContext,
        credential: &str,
    ) -> Result<OverrideGrant, GateError> {
        let grant = self.overrides.grant(session, credential)?;
        tracing::warn!(
            session_id = %session.session_id,
            expires_at = %grant.expires_at,
            "override grant issued"
        );
        Ok(grant)
    }

    /// Engage or release the autonomous kill switch.
    pub fn set_kill_switch(&self, engaged: bool) {
        self.guardrails.set_kill_switch(engaged);
    }

    /// Pending confirmation lookup (UI polling).
    pub async fn pending(&self, confirmation_id: &str) -> Option<PendingConfirmation> {
        self.confirmations.get(confirmation_id).await
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    async fn execute_and_record(
        &self,
        sanitized: &SanitizedAction,
        tier: Tier,
        session: &SessionContext,
        rationale: String,
    ) -> Result<Decision> {
        let action = sanitized.action();

        match self.dispatch(sanitized, tier).await {
            Ok(output) => {
                let mut record =
                    base_record(action, session, Some(tier), AuditDecision::Executed);
                record.rationale = rationale;
                record.outcome = Some(output.clone());
                self.append_audit(record).await?;

                Ok(Decision::Executed { result: output })
            }
            Err(failure) => {
                let mut record =
                    base_record(action, session, Some(tier), AuditDecision::ExecutionFailed);
                record.rationale = rationale;
                record.outcome = Some(failure.clone());
                self.append_audit(record).await?;

                Ok(Decision::Rejected {
                    reason: format!("execution failed: {}", failure),
                })
            }
        }
    }

    /// Dispatch through the executor under the execution timeout.
    ///
    /// One retry is allowed only when all of: the actor is unattended, the
    /// tier is NOTIFY, and the registry marks the action idempotent.
    /// Anything stricter escalates to a human instead of retrying.
    async fn dispatch(&self, sanitized: &SanitizedAction, tier: Tier) -> Result<String, String> {
        let action = sanitized.action();
        let idempotent = self
            .registry
            .get(&action.name)
            .map(|s| s.idempotent)
            .unwrap_or(false);
        let retries = if action.actor.is_unattended() && tier == Tier::Notify && idempotent {
            1
        } else {
            0
        };

        let mut last_failure = String::new();
        for attempt in 0..=retries {
            match tokio::time::timeout(self.execution_timeout, self.executor.execute(sanitized))
                .await
            {
                Ok(Ok(output)) => return Ok(output),
                Ok(Err(e)) => last_failure = e.to_string(),
                Err(_) => {
                    last_failure =
                        format!("timed out after {}s", self.execution_timeout.as_secs())
                }
            }
            if attempt < retries {
                tracing::warn!(
                    request_id = %action.request_id,
                    "execution attempt failed ({}), retrying once",
                    last_failure
                );
            }
        }
        Err(last_failure)
    }

    async fn reject(
        &self,
        action: &Action,
        session: &SessionContext,
        tier: Option<Tier>,
        audit_decision: AuditDecision,
        reason: String,
    ) -> Result<Decision> {
        let mut record = base_record(action, session, tier, audit_decision);
        record.rationale = reason.clone();
        self.append_audit(record).await?;

        Ok(Decision::Rejected { reason })
    }

    async fn append_audit(&self, record: AuditRecord) -> Result<()> {
        self.audit
            .lock()
            .await
            .append(&record)
            .map_err(|e| anyhow::anyhow!(GateError::Audit(e.to_string())))
    }

    /// Reserve a request id in the idempotence cache, atomically under the
    /// lock. Aged-out decided entries are swept on the way in.
    fn reserve(&self, request_id: &str) -> Reservation {
        let mut seen = self.seen.lock().expect("decision cache poisoned");
        let now = Instant::now();
        seen.retain(|_, slot| match slot {
            Slot::InFlight(_) => true,
            Slot::Decided { at, .. } => now.duration_since(*at) < self.replay_retention,
        });

        match seen.get(request_id) {
            Some(Slot::Decided { decision, .. }) => Reservation::Replay(decision.clone()),
            Some(Slot::InFlight(rx)) => Reservation::Wait(rx.clone()),
            None => {
                let (tx, rx) = watch::channel(None);
                seen.insert(request_id.to_string(), Slot::InFlight(rx));
                Reservation::Owner(tx)
            }
        }
    }

    /// Overwrite the cached decision for an already-decided request id
    /// (confirmation resolutions turn a cached Pending terminal).
    fn record_decision(&self, request_id: &str, decision: &Decision) {
        self.seen.lock().expect("decision cache poisoned").insert(
            request_id.to_string(),
            Slot::Decided {
                decision: decision.clone(),
                at: Instant::now(),
            },
        );
    }

    #[cfg(test)]
    fn set_replay_retention(&mut self, retention: Duration) {
        self.replay_retention = retention;
    }
}

fn base_record(
    action: &Action,
    session: &SessionContext,
    tier: Option<Tier>,
    decision: AuditDecision,
) -> AuditRecord {
    AuditRecord {
        timestamp: Utc::now(),
        request_id: action.request_id.clone(),
        session_id: session.session_id.clone(),
        actor: action.actor,
        action: action.name.clone(),
        targets: action.targets.clone(),
        tier,
        decision,
        outcome: None,
        rationale: String::new(),
    }
}
