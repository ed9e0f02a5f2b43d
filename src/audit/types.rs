//! Types for the Fleetgate audit trail.
//!
//! Every submission leaves exactly one record per decision, and every
//! terminal confirmation state leaves exactly one record. Records are
//! append-only and never updated.

use crate::types::{Actor, Tier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the gateway decided, as recorded. `ExecutionFailed` is distinct
/// from `Rejected`: the decision was "execute" even though the effect may
/// not have completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditDecision {
    Executed,
    ExecutionFailed,
    Pending,
    Rejected,
    Blocked,
}

impl AuditDecision {
    pub fn from_str_loose(s: &str) -> Option<AuditDecision> {
        match s.to_lowercase().trim() {
            "executed" | "exec" => Some(AuditDecision::Executed),
            "execution_failed" | "failed" => Some(AuditDecision::ExecutionFailed),
            "pending" => Some(AuditDecision::Pending),
            "rejected" | "denied" => Some(AuditDecision::Rejected),
            "blocked" => Some(AuditDecision::Blocked),
            _ => None,
        }
    }
}

/// A single append-only entry in the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// When the decision was made.
    pub timestamp: DateTime<Utc>,

    /// The proposal this record belongs to.
    pub request_id: String,

    /// Session the submission ran under.
    pub session_id: String,

    /// Who proposed the action.
    pub actor: Actor,

    /// Action name from the registry.
    pub action: String,

    /// Every target the action named.
    pub targets: Vec<String>,

    /// Effective tier after escalation, when classification ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,

    /// The decision.
    pub decision: AuditDecision,

    /// Execution output or failure detail, when dispatch was attempted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,

    /// Why the decision came out this way. Always human-readable.
    pub rationale: String,
}

/// Summary statistics across a session's audit trail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub total: usize,
    pub executed: usize,
    pub failed: usize,
    pub pending: usize,
    pub rejected: usize,
    pub blocked: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl SessionSummary {
    /// One-liner for terminal output.
    pub fn one_line(&self) -> String {
        format!(
            "{} decisions | {} executed | {} rejected | {} blocked | {} pending",
            self.total, self.executed, self.rejected, self.blocked, self.pending
        )
    }
}

/// Filter criteria for querying the audit trail.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub actor: Option<Actor>,
    pub decision: Option<AuditDecision>,
    pub limit: Option<usize>,
}
