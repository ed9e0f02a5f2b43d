//! End-to-end test: gateway server + client over a Unix socket.
//!
//! Starts a real gateway server on a Unix socket, sends collaborator
//! requests through the synchronous client, and verifies decisions come
//! back over the wire as they do through the library API.
//!
//! Note: the GatewayClient uses blocking I/O, so all client calls run
//! inside `spawn_blocking` to avoid stalling the tokio runtime the
//! server lives on.

use fleetgate::audit::AuditLogger;
use fleetgate::config::parser;
use fleetgate::confirm::TracingNotifier;
use fleetgate::executor::{Executor, RecordingExecutor};
use fleetgate::gateway::client::GatewayClient;
use fleetgate::gateway::protocol::WireResponse;
use fleetgate::gateway::server::GatewayServer;
use fleetgate::gateway::ExecutionGateway;
use fleetgate::types::{ActionArgs, Actor, Decision};
use std::sync::Arc;
use tempfile::TempDir;

struct E2e {
    client: Arc<GatewayClient>,
    executor: Arc<RecordingExecutor>,
    _tmp: TempDir,
    _server: tokio::task::JoinHandle<()>,
}

async fn setup() -> E2e {
    let tmp = TempDir::new().unwrap();

    let mut config =
        parser::parse_config_str(include_str!("fixtures/test_config.yaml")).unwrap();
    config.sanitizer.base_dirs = vec![tmp.path().to_path_buf()];

    let audit = AuditLogger::with_path(tmp.path().join("audit.jsonl")).unwrap();
    let executor = Arc::new(RecordingExecutor::new());
    let gateway = ExecutionGateway::new(
        &config,
        audit,
        Arc::clone(&executor) as Arc<dyn Executor + Send + Sync>,
        Arc::new(TracingNotifier),
    )
    .unwrap();

    let socket_path = format!("/tmp/fleetgate-test-{}.sock", uuid::Uuid::new_v4());
    let server = GatewayServer::new(&socket_path, Arc::new(gateway));
    let handle = tokio::spawn(async move {
        server.run().await.ok();
    });

    // Give the server a moment to bind the socket.
    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    E2e {
        client: Arc::new(GatewayClient::new(&socket_path, "sess-e2e")),
        executor,
        _tmp: tmp,
        _server: handle,
    }
}

async fn propose(
    client: &Arc<GatewayClient>,
    name: &str,
    targets: &[&str],
    actor: Actor,
) -> WireResponse {
    let c = client.clone();
    let name = name.to_string();
    let targets: Vec<String> = targets.iter().map(|s| s.to_string()).collect();
    tokio::task::spawn_blocking(move || {
        c.propose(&name, targets, ActionArgs::default(), actor).unwrap()
    })
    .await
    .unwrap()
}

async fn resolve(client: &Arc<GatewayClient>, id: &str, approve: bool) -> WireResponse {
    let c = client.clone();
    let id = id.to_string();
    tokio::task::spawn_blocking(move || c.resolve(&id, approve).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn observe_action_executes_over_the_wire() {
    let e2e = setup().await;

    let response = propose(&e2e.client, "vm_status", &["vm-101"], Actor::Agent).await;
    assert!(response.ok);
    assert!(matches!(response.decision, Some(Decision::Executed { .. })));
    assert_eq!(e2e.executor.executed_count(), 1);
}

#[tokio::test]
async fn protected_target_rejected_over_the_wire() {
    let e2e = setup().await;

    let response = propose(&e2e.client, "guest_stop", &["pve-master"], Actor::Human).await;
    assert!(response.ok);
    let Some(Decision::Rejected { reason }) = response.decision else {
        panic!("expected rejected, got {:?}", response.decision);
    };
    assert!(reason.contains("pve-master"));
    assert_eq!(e2e.executor.executed_count(), 0);
}

#[tokio::test]
async fn confirm_round_trip_approve() {
    let e2e = setup().await;

    let response = propose(&e2e.client, "host_reboot", &["hv-7"], Actor::Agent).await;
    let Some(Decision::Pending { confirmation_id }) = response.decision else {
        panic!("expected pending, got {:?}", response.decision);
    };
    assert_eq!(e2e.executor.executed_count(), 0);

    let resolved = resolve(&e2e.client, &confirmation_id, true).await;
    assert!(resolved.ok);
    assert!(matches!(resolved.decision, Some(Decision::Executed { .. })));
    assert_eq!(e2e.executor.executed_count(), 1);
}

#[tokio::test]
async fn confirm_round_trip_deny() {
    let e2e = setup().await;

    let response = propose(&e2e.client, "host_reboot", &["hv-7"], Actor::Agent).await;
    let Some(Decision::Pending { confirmation_id }) = response.decision else {
        panic!("expected pending");
    };

    let resolved = resolve(&e2e.client, &confirmation_id, false).await;
    assert!(resolved.ok);
    assert!(matches!(resolved.decision, Some(Decision::Rejected { .. })));
    assert_eq!(e2e.executor.executed_count(), 0);
}

#[tokio::test]
async fn another_session_cannot_resolve_a_confirmation() {
    let e2e = setup().await;

    let response = propose(&e2e.client, "host_reboot", &["hv-7"], Actor::Agent).await;
    let Some(Decision::Pending { confirmation_id }) = response.decision else {
        panic!("expected pending");
    };

    // Fresh client under a different session id.
    let intruder = Arc::new(GatewayClient::new(
        e2e.client_socket(),
        "sess-intruder",
    ));
    let resolved = resolve(&intruder, &confirmation_id, true).await;
    assert!(!resolved.ok);
    assert!(resolved.error.unwrap().contains("different session"));
    assert_eq!(e2e.executor.executed_count(), 0);
}

#[tokio::test]
async fn elevate_with_bad_credential_fails_over_the_wire() {
    let e2e = setup().await;

    let c = e2e.client.clone();
    let response = tokio::task::spawn_blocking(move || c.elevate("wrong").unwrap())
        .await
        .unwrap();
    assert!(!response.ok);
    assert!(response.error.unwrap().contains("rejected"));
}

#[tokio::test]
async fn malformed_json_gets_an_error_response() {
    let e2e = setup().await;

    let socket = e2e.client_socket().to_path_buf();
    let response = tokio::task::spawn_blocking(move || {
        use std::io::{BufRead, BufReader, Write};
        let mut stream = std::os::unix::net::UnixStream::connect(&socket).unwrap();
        stream.write_all(b"this is not json\n").unwrap();
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        serde_json::from_str::<WireResponse>(line.trim()).unwrap()
    })
    .await
    .unwrap();

    assert!(!response.ok);
    assert!(response.error.unwrap().contains("Invalid request JSON"));
}

impl E2e {
    fn client_socket(&self) -> &std::path::Path {
        self.client.socket_path()
    }
}
