//! Fleetgate — tiered action-authorization gateway.
//!
//! Quick start:
//!   fleetgate init                 # write a starter config
//!   fleetgate check fleetgate.yaml # validate it
//!   fleetgate serve                # run the gateway
//!   fleetgate log                  # see what was decided
//!
//! For more info: fleetgate --help

use clap::{Parser, Subcommand};
use colored::Colorize;
use fleetgate::cli;
use std::path::PathBuf;

/// Fleetgate — the choke point between your agent and your fleet.
///
/// Every side-effecting action an agent proposes goes through one
/// pipeline: sanitize, protected-resource guard, tier classification,
/// guardrails, then execute, notify, confirm, or refuse. Everything is
/// logged.
#[derive(Parser)]
#[command(
    name = "fleetgate",
    version,
    about = "Tiered authorization gateway between an agent and your fleet",
    long_about = "Fleetgate mediates every side-effecting action an AI agent\n\
                  proposes against your infrastructure. Read-only actions pass,\n\
                  low-risk ones execute with notification, dangerous ones wait\n\
                  for a human, and some never run at all.\n\n\
                  Quick start:\n  \
                  fleetgate init       # write a starter config\n  \
                  fleetgate serve      # run the gateway\n  \
                  fleetgate log        # see what was decided"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gateway server on a Unix socket
    Serve {
        /// Path to the config file
        #[arg(short, long, default_value = "fleetgate.yaml")]
        config: PathBuf,

        /// Unix socket to listen on
        #[arg(short, long, default_value = "/tmp/fleetgate.sock")]
        socket: PathBuf,
    },

    /// Validate a config file
    Check {
        /// Path to the config file
        #[arg(default_value = "fleetgate.yaml")]
        config: PathBuf,
    },

    /// Create a config file from a template
    Init {
        #[arg(short, long, default_value = "pve-fleet")]
        template: String,
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Browse the audit trail
    Log {
        /// Show a specific session
        #[arg(short, long, help = "Session ID to view")]
        session: Option<String>,

        /// Filter by actor
        #[arg(short, long, help = "Filter: human, agent, autonomous")]
        actor: Option<String>,

        /// Filter by decision
        #[arg(
            short,
            long,
            help = "Filter: executed, failed, pending, rejected, blocked"
        )]
        decision: Option<String>,

        /// Limit number of records shown
        #[arg(short, long, help = "Max records to show")]
        limit: Option<usize>,

        /// Show only the summary
        #[arg(long, help = "Show only the session summary")]
        summary: bool,

        /// List all available sessions
        #[arg(long, help = "List all recorded sessions")]
        list: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fleetgate=info".parse().unwrap()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { config, socket } => cli::serve::run_serve(&config, &socket).await,

        Commands::Check { config } => cli::serve::run_check(&config),

        Commands::Init { template, output } => {
            cli::init::run_init(Some(&template), output.as_deref())
        }

        Commands::Log {
            session,
            actor,
            decision,
            limit,
            summary,
            list,
        } => {
            if list {
                cli::log::run_log_list()
            } else {
                cli::log::run_log(
                    session.as_deref(),
                    actor.as_deref(),
                    decision.as_deref(),
                    limit,
                    summary,
                )
            }
        }
    };

    if let Err(e) = result {
        eprintln!();
        eprintln!("  {} {}", "✗".red().bold(), e);
        for cause in e.chain().skip(1) {
            eprintln!("  {} {}", "caused by:".dimmed(), cause);
        }
        eprintln!();
        std::process::exit(1);
    }
}
