//! Core types for the Fleetgate authorization pipeline.
//!
//! These types define proposed actions, the actors that propose them, the
//! ordered strictness tiers, and the decisions the gateway hands back.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Who is proposing an action.
///
/// The gateway trusts these identities differently: a human gets the
/// loosest handling, the chat agent sits in the middle, and the unattended
/// remediation path additionally runs through the guardrails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    /// A human operator acting through the chat/UI layer.
    Human,
    /// The conversational agent acting inside a human-attended session.
    Agent,
    /// The unattended remediation loop. Subject to guardrails.
    AutonomousRemediation,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Human => write!(f, "human"),
            Actor::Agent => write!(f, "agent"),
            Actor::AutonomousRemediation => write!(f, "autonomous-remediation"),
        }
    }
}

impl Actor {
    /// Parse an actor from a string (used by the CLI log filters).
    pub fn from_str_loose(s: &str) -> Option<Actor> {
        match s.to_lowercase().trim() {
            "human" | "operator" => Some(Actor::Human),
            "agent" | "chat" => Some(Actor::Agent),
            "autonomous-remediation" | "autonomous" | "remediation" | "auto" => {
                Some(Actor::AutonomousRemediation)
            }
            _ => None,
        }
    }

    /// Whether this actor runs without a human watching.
    pub fn is_unattended(&self) -> bool {
        matches!(self, Actor::AutonomousRemediation)
    }
}

/// The ordered strictness level assigned to an action.
///
/// Ordering is load-bearing: escalation rules only ever move an action
/// toward the stricter end, and nothing loosens `Forbidden`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Read-only. Always allowed.
    Observe,
    /// Side-effecting but auto-executes. Always logged.
    Notify,
    /// Requires explicit human approval before execution.
    Confirm,
    /// Never auto-executes, under any circumstance, including override.
    Forbidden,
}

impl Tier {
    /// Move one step toward stricter handling. `Forbidden` stays put.
    pub fn escalate(self) -> Tier {
        match self {
            Tier::Observe => Tier::Notify,
            Tier::Notify => Tier::Confirm,
            Tier::Confirm | Tier::Forbidden => Tier::Forbidden,
        }
    }

    /// Parse a tier from a string (used during YAML config parsing).
    pub fn from_str_loose(s: &str) -> Option<Tier> {
        match s.to_lowercase().trim() {
            "observe" | "read" | "readonly" => Some(Tier::Observe),
            "notify" => Some(Tier::Notify),
            "confirm" | "approval" => Some(Tier::Confirm),
            "forbidden" | "never" | "deny" => Some(Tier::Forbidden),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Observe => write!(f, "observe"),
            Tier::Notify => write!(f, "notify"),
            Tier::Confirm => write!(f, "confirm"),
            Tier::Forbidden => write!(f, "forbidden"),
        }
    }
}

/// Argument payload carried by a proposed action.
///
/// The well-known keys the sanitizer understands are typed; anything else
/// rides along in `extra` and is size-checked but otherwise opaque.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionArgs {
    /// Filesystem path argument (canonicalized by the sanitizer).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Outbound URL argument (DNS-checked by the sanitizer).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Free-text remote command (verb allow-listed by the sanitizer).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Hint for how long the action may run, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_hint_secs: Option<u64>,

    /// Everything else, key-value. Opaque to the gateway.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl ActionArgs {
    /// Total payload size in bytes, used for the sanitizer size cap.
    pub fn payload_bytes(&self) -> usize {
        self.path.as_deref().map_or(0, str::len)
            + self.url.as_deref().map_or(0, str::len)
            + self.command.as_deref().map_or(0, str::len)
            + self
                .extra
                .iter()
                .map(|(k, v)| k.len() + v.len())
                .sum::<usize>()
    }
}

/// A proposed, named, side-effecting operation. Immutable once created.
///
/// `targets` makes the blast radius explicit: one `Action` is one
/// submission, and the number of distinct entries in `targets` is the
/// number of hosts/resources it would touch. Batches must be expressed as
/// a single action with multiple targets so the multi-target rules can see
/// them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Unique per proposal. Resubmitting the same id replays the original
    /// decision instead of executing twice.
    pub request_id: String,

    /// Identifier from the closed action registry (e.g. "guest_stop").
    pub name: String,

    /// Resolved resource identifiers. First entry is the primary target.
    pub targets: Vec<String>,

    /// Argument payload.
    #[serde(default)]
    pub args: ActionArgs,

    /// Who proposed it.
    pub actor: Actor,

    /// For the autonomous path: which remediation rule produced this
    /// action. Keys the per-rule guardrail counter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation_rule: Option<String>,
}

impl Action {
    /// The primary target (first entry), or an empty string for a
    /// malformed target-less action — the sanitizer rejects those.
    pub fn primary_target(&self) -> &str {
        self.targets.first().map_or("", String::as_str)
    }

    /// Number of distinct targets this action would touch.
    pub fn blast_radius(&self) -> usize {
        let mut seen: Vec<&str> = self.targets.iter().map(String::as_str).collect();
        seen.sort_unstable();
        seen.dedup();
        seen.len()
    }
}

/// An action that has passed the sanitizer.
///
/// Newtype so the rest of the pipeline can demand, at the type level, that
/// arguments were normalized before classification or dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizedAction(Action);

impl SanitizedAction {
    /// Only the sanitizer constructs these.
    pub(crate) fn new(action: Action) -> Self {
        Self(action)
    }

    pub fn action(&self) -> &Action {
        &self.0
    }

    pub fn into_inner(self) -> Action {
        self.0
    }
}

/// The session/request context a submission runs under.
///
/// Override grants and pending confirmations are keyed by `session_id`;
/// two concurrent sessions never observe each other's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: String,
    /// Operator name for audit attribution, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            operator: None,
        }
    }

    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }
}

/// What the gateway decided for a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// The action ran. `result` is the executor's output.
    Executed { result: String },
    /// The action is parked awaiting human confirmation.
    Pending { confirmation_id: String },
    /// The action will not run. Reason is always human-readable.
    Rejected { reason: String },
}

impl Decision {
    pub fn is_executed(&self) -> bool {
        matches!(self, Decision::Executed { .. })
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Decision::Pending { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Decision::Rejected { .. })
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Executed { .. } => write!(f, "executed"),
            Decision::Pending { confirmation_id } => {
                write!(f, "pending confirmation {}", confirmation_id)
            }
            Decision::Rejected { reason } => write!(f, "rejected: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_ordering_matches_strictness() {
        assert!(Tier::Observe < Tier::Notify);
        assert!(Tier::Notify < Tier::Confirm);
        assert!(Tier::Confirm < Tier::Forbidden);
    }

    #[test]
    fn tier_escalation_is_monotone_and_capped() {
        assert_eq!(Tier::Observe.escalate(), Tier::Notify);
        assert_eq!(Tier::Notify.escalate(), Tier::Confirm);
        assert_eq!(Tier::Confirm.escalate(), Tier::Forbidden);
        assert_eq!(Tier::Forbidden.escalate(), Tier::Forbidden);
    }

    #[test]
    fn blast_radius_counts_distinct_targets() {
        let action = Action {
            request_id: "r1".into(),
            name: "guest_stop".into(),
            targets: vec!["vm-101".into(), "vm-102".into(), "vm-101".into()],
            args: ActionArgs::default(),
            actor: Actor::Agent,
            remediation_rule: None,
        };
        assert_eq!(action.blast_radius(), 2);
        assert_eq!(action.primary_target(), "vm-101");
    }

    #[test]
    fn actor_parsing_aliases() {
        assert_eq!(Actor::from_str_loose("Human"), Some(Actor::Human));
        assert_eq!(
            Actor::from_str_loose("autonomous"),
            Some(Actor::AutonomousRemediation)
        );
        assert_eq!(Actor::from_str_loose("martian"), None);
    }
}
