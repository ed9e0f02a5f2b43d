//! Error taxonomy for the authorization pipeline.
//!
//! Each variant maps to a distinct failure class with different handling:
//! sanitization and auth failures go back to the caller, protected-resource
//! and classification failures are terminal rejections, guardrail blocks
//! surface as escalations, and execution failures are logged as
//! attempted-but-failed (the gateway's decision was still "execute").

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    /// Malformed or unsafe argument. Recoverable by the caller; nothing
    /// was partially applied.
    #[error("sanitization failed: {0}")]
    Sanitization(String),

    /// The target is on the protected-resource list. Terminal, never
    /// retried automatically.
    #[error("protected resource '{target}': {reason}")]
    ProtectedResource { target: String, reason: String },

    /// Unknown action name. Treated as FORBIDDEN (fail-closed).
    #[error("unknown action '{0}' — not in the registry")]
    Classification(String),

    /// Invalid override credential. Deliberately says nothing about how
    /// close the credential was.
    #[error("override credential rejected")]
    Auth,

    /// Rate limit, kill switch, or blast-radius block on the autonomous
    /// path. Surfaced as an explicit escalation, never swallowed.
    #[error("guardrail blocked: {0}")]
    GuardrailBlocked(String),

    /// The execution collaborator failed or timed out after the gateway
    /// decided to execute. Distinct from a rejection.
    #[error("execution failed: {0}")]
    Execution(String),

    /// The audit record could not be written. Fail-closed: the submission
    /// must not be reported as executed.
    #[error("audit write failed: {0}")]
    Audit(String),

    /// No pending confirmation with that id, or it belongs to another
    /// session.
    #[error("confirmation error: {0}")]
    Confirmation(String),
}

impl GateError {
    /// The human-readable rejection reason carried into audit records and
    /// wire responses.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}
