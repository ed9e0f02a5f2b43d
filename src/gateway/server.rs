//! Gateway socket server.
//!
//! Listens on a Unix domain socket and feeds each JSON-line request
//! through the `ExecutionGateway` pipeline. Collaborators hold one
//! connection per session or open a fresh one per request; both work,
//! since all shared state lives in the gateway.

use crate::gateway::protocol::{WireRequest, WireResponse};
use crate::gateway::ExecutionGateway;
use crate::types::{Action, SessionContext};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;

/// Socket front end over a shared `ExecutionGateway`.
pub struct GatewayServer {
    socket_path: PathBuf,
    gateway: Arc<ExecutionGateway>,
}

impl GatewayServer {
    pub fn new(socket_path: impl AsRef<Path>, gateway: Arc<ExecutionGateway>) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
            gateway,
        }
    }

    /// Bind the socket and serve until the process is stopped.
    pub async fn run(&self) -> Result<()> {
        // Remove a stale socket from a previous run.
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        let listener = UnixListener::bind(&self.socket_path)
            .with_context(|| format!("Failed to bind socket: {}", self.socket_path.display()))?;

        tracing::info!("Gateway listening on {}", self.socket_path.display());

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let gateway = Arc::clone(&self.gateway);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, gateway).await {
                            tracing::error!("Connection handler error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}

/// Handle a single collaborator connection.
async fn handle_connection(
    stream: tokio::net::UnixStream,
    gateway: Arc<ExecutionGateway>,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break; // Connection closed
        }

        let response = match serde_json::from_str::<WireRequest>(line.trim()) {
            Ok(request) => process_request(request, &gateway).await,
            Err(e) => WireResponse::failed(format!("Invalid request JSON: {}", e)),
        };

        let json = serde_json::to_string(&response)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Route one wire request through the gateway.
async fn process_request(request: WireRequest, gateway: &ExecutionGateway) -> WireResponse {
    match request {
        WireRequest::Propose {
            request_id,
            name,
            targets,
            args,
            actor,
            session_id,
            operator,
            remediation_rule,
        } => {
            let mut session = SessionContext::new(session_id);
            if let Some(operator) = operator {
                session = session.with_operator(operator);
            }
            let action = Action {
                request_id,
                name,
                targets,
                args,
                actor,
                remediation_rule,
            };
            match gateway.submit(action, &session).await {
                Ok(decision) => WireResponse::decided(decision),
                Err(e) => WireResponse::failed(e.to_string()),
            }
        }
        WireRequest::Resolve {
            confirmation_id,
            approve,
            session_id,
        } => {
            let session = SessionContext::new(session_id);
            match gateway
                .resolve_confirmation(&confirmation_id, approve, &session)
                .await
            {
                Ok(decision) => WireResponse::decided(decision),
                Err(e) => WireResponse::failed(e.to_string()),
            }
        }
        WireRequest::Elevate {
            session_id,
            credential,
        } => {
            let session = SessionContext::new(session_id);
            match gateway.request_override(&session, &credential) {
                Ok(grant) => WireResponse::elevated(&grant),
                Err(e) => WireResponse::failed(e.to_string()),
            }
        }
    }
}
