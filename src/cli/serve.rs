//! `fleetgate serve` — run the gateway on a Unix socket.

use crate::audit::AuditLogger;
use crate::config::parser;
use crate::confirm::TracingNotifier;
use crate::executor::{EchoExecutor, Executor};
use crate::gateway::server::GatewayServer;
use crate::gateway::ExecutionGateway;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Run the gateway server until interrupted.
///
/// The bundled executor only echoes; wiring a real fleet executor is a
/// library-level integration (see `fleetgate::executor::Executor`).
pub async fn run_serve(config_path: &Path, socket_path: &Path) -> Result<()> {
    let config = parser::parse_config_file(config_path)?;

    let session_id = format!(
        "serve-{}-{}",
        chrono::Utc::now().format("%Y%m%d-%H%M%S"),
        &Uuid::new_v4().to_string()[..8]
    );
    let audit = AuditLogger::new(&session_id).context("Failed to open audit log")?;

    println!();
    println!("  {}  {}", "fleetgate".bold(), config.name.cyan());
    println!(
        "  {} actions registered, {} protected entries",
        config.actions.len(),
        config.protected.len()
    );
    println!("  Session: {}", session_id.dimmed());
    println!("  Socket:  {}", socket_path.display().to_string().dimmed());
    if config.override_secret().is_none() {
        println!(
            "  {} override grants disabled (no credential in environment)",
            "ℹ".blue()
        );
    }
    println!();

    let gateway = ExecutionGateway::new(
        &config,
        audit,
        Arc::new(EchoExecutor) as Arc<dyn Executor + Send + Sync>,
        Arc::new(TracingNotifier),
    )?;

    let server = GatewayServer::new(socket_path, Arc::new(gateway));
    server.run().await
}

/// Run the `fleetgate check` command: parse and validate a config file.
pub fn run_check(config_path: &Path) -> Result<()> {
    let config = parser::parse_config_file(config_path)?;

    println!();
    println!("  {} Config is valid!", "✓".green().bold());
    println!("  Gateway: {}", config.name.cyan());
    println!("  Self host: {}", config.self_host);
    println!();
    println!("  Actions:");
    for spec in &config.actions {
        println!(
            "    {:<20} {:<10} {}",
            spec.name.bold(),
            spec.tier.to_string(),
            spec.description.dimmed()
        );
    }
    println!();
    println!("  Protected resources:");
    for entry in &config.protected {
        println!("    {:<20} {}", entry.pattern.bold(), entry.reason.dimmed());
    }
    if config.quorum_peers.len() <= 4 && !config.quorum_peers.is_empty() {
        println!(
            "    {:<20} {}",
            config.quorum_peers.join(", ").bold(),
            "quorum peers (auto-protected)".dimmed()
        );
    }
    println!(
        "    {:<20} {}",
        config.self_host.bold(),
        "gateway host (auto-protected)".dimmed()
    );
    println!();

    Ok(())
}
