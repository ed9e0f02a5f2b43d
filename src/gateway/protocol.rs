//! Gateway IPC protocol types.
//!
//! Defines the JSON messages exchanged between collaborators (the chat
//! agent, the remediation loop, the operator UI) and the gateway over a
//! Unix domain socket. One JSON object per line in each direction.

use crate::elevate::OverrideGrant;
use crate::types::{ActionArgs, Actor, Decision};
use serde::{Deserialize, Serialize};

/// A request to the gateway. Sent as a JSON line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireRequest {
    /// Propose an action for authorization and (maybe) execution.
    Propose {
        request_id: String,
        name: String,
        targets: Vec<String>,
        #[serde(default)]
        args: ActionArgs,
        actor: Actor,
        session_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operator: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        remediation_rule: Option<String>,
    },
    /// Approve or deny a pending confirmation.
    Resolve {
        confirmation_id: String,
        approve: bool,
        session_id: String,
    },
    /// Request a session-scoped override grant.
    Elevate {
        session_id: String,
        credential: String,
    },
}

/// A response from the gateway back to the collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireResponse {
    /// Whether the request itself was processed (a rejection decision is
    /// still `ok: true` — the pipeline ran).
    pub ok: bool,

    /// The decision, for propose/resolve requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,

    /// Grant details, for a successful elevate request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grant_expires_at: Option<String>,

    /// Why the request could not be processed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WireResponse {
    pub fn decided(decision: Decision) -> Self {
        Self {
            ok: true,
            decision: Some(decision),
            grant_expires_at: None,
            error: None,
        }
    }

    pub fn elevated(grant: &OverrideGrant) -> Self {
        Self {
            ok: true,
            decision: None,
            grant_expires_at: Some(grant.expires_at.to_rfc3339()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            decision: None,
            grant_expires_at: None,
            error: Some(error.into()),
        }
    }
}
