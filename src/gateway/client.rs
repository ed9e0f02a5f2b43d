//! Gateway client — sends requests to a running gateway over its Unix
//! socket.
//!
//! Used by:
//! 1. The remediation loop and chat-agent integration
//! 2. Integration/E2E tests exercising the full pipeline
//! 3. Operator tooling resolving confirmations from a terminal

use crate::gateway::protocol::{WireRequest, WireResponse};
use crate::types::{ActionArgs, Actor};
use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Synchronous client for a Fleetgate socket. Each call opens a new
/// connection.
pub struct GatewayClient {
    socket_path: PathBuf,
    session_id: String,
}

impl GatewayClient {
    pub fn new(socket_path: impl AsRef<Path>, session_id: impl Into<String>) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
            session_id: session_id.into(),
        }
    }

    /// Create a client using the FLEETGATE_SOCKET environment variable.
    pub fn from_env(session_id: impl Into<String>) -> Result<Self> {
        let socket_path = std::env::var("FLEETGATE_SOCKET").context(
            "FLEETGATE_SOCKET environment variable not set. Is the gateway running?",
        )?;
        Ok(Self::new(socket_path, session_id))
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Send a raw request and read back the response.
    pub fn send(&self, request: &WireRequest) -> Result<WireResponse> {
        let mut stream = UnixStream::connect(&self.socket_path).with_context(|| {
            format!(
                "Failed to connect to gateway at {}. Is fleetgate serving?",
                self.socket_path.display()
            )
        })?;

        let json = serde_json::to_string(request)?;
        stream.write_all(json.as_bytes())?;
        stream.write_all(b"\n")?;
        stream.flush()?;

        let mut reader = BufReader::new(stream);
        let mut response_line = String::new();
        reader.read_line(&mut response_line)?;

        let response: WireResponse = serde_json::from_str(response_line.trim())
            .context("Failed to parse gateway response")?;
        Ok(response)
    }

    /// Propose an action with a fresh request id.
    pub fn propose(
        &self,
        name: &str,
        targets: Vec<String>,
        args: ActionArgs,
        actor: Actor,
    ) -> Result<WireResponse> {
        self.send(&WireRequest::Propose {
            request_id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            targets,
            args,
            actor,
            session_id: self.session_id.clone(),
            operator: None,
            remediation_rule: None,
        })
    }

    /// Propose on behalf of the remediation loop, keyed to a rule.
    pub fn propose_remediation(
        &self,
        name: &str,
        targets: Vec<String>,
        rule: &str,
    ) -> Result<WireResponse> {
        self.send(&WireRequest::Propose {
            request_id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            targets,
            args: ActionArgs::default(),
            actor: Actor::AutonomousRemediation,
            session_id: self.session_id.clone(),
            operator: None,
            remediation_rule: Some(rule.to_string()),
        })
    }

    /// Approve or deny a pending confirmation.
    pub fn resolve(&self, confirmation_id: &str, approve: bool) -> Result<WireResponse> {
        self.send(&WireRequest::Resolve {
            confirmation_id: confirmation_id.to_string(),
            approve,
            session_id: self.session_id.clone(),
        })
    }

    /// Request an override grant for this session.
    pub fn elevate(&self, credential: &str) -> Result<WireResponse> {
        self.send(&WireRequest::Elevate {
            session_id: self.session_id.clone(),
            credential: credential.to_string(),
        })
    }
}
