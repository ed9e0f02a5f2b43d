//! `fleetgate log` — browse and display the audit trail.
//!
//! Shows what the gateway decided in a session: every proposed action,
//! its effective tier, and whether it executed, waited, or was refused.

use crate::audit::{AuditDecision, AuditReader, LogFilter};
use crate::types::Actor;
use anyhow::{Context, Result};
use colored::Colorize;

/// Run the `fleetgate log` command.
pub fn run_log(
    session_id: Option<&str>,
    actor_filter: Option<&str>,
    decision_filter: Option<&str>,
    limit: Option<usize>,
    summary_only: bool,
) -> Result<()> {
    let reader = AuditReader::new().context("Failed to initialize log reader")?;

    let records = if let Some(sid) = session_id {
        reader
            .read_session(sid)
            .with_context(|| format!("Failed to read session: {}", sid))?
    } else {
        let records = reader.read_latest_session()?;
        if records.is_empty() {
            println!();
            println!("  {} No audit records found.", "ℹ".blue());
            println!("  Start the gateway first:");
            println!("    {}", "fleetgate serve --config fleetgate.yaml".dimmed());
            println!();
            return Ok(());
        }
        records
    };

    let filter = LogFilter {
        actor: actor_filter.and_then(Actor::from_str_loose),
        decision: decision_filter.and_then(AuditDecision::from_str_loose),
        limit,
    };
    let filtered = AuditReader::filter_records(&records, &filter);

    let summary = AuditReader::summarize(&records);

    if summary_only {
        println!();
        println!("  Session: {}", summary.session_id.cyan());
        println!();
        println!(
            "  {} total | {} executed | {} failed | {} rejected | {} blocked | {} pending",
            summary.total.to_string().bold(),
            summary.executed.to_string().green().bold(),
            summary.failed.to_string().red(),
            summary.rejected.to_string().red().bold(),
            summary.blocked.to_string().magenta().bold(),
            summary.pending.to_string().yellow().bold(),
        );
        if let (Some(start), Some(end)) = (summary.start_time, summary.end_time) {
            let duration = end - start;
            println!("  Duration: {}", format_duration(duration.num_seconds()));
        }
        println!();
    } else {
        println!();
        if let Some(first) = filtered.first() {
            println!("  Session: {}", first.session_id.cyan());
            println!();
        }

        for record in &filtered {
            println!("  {}", AuditReader::format_record(record));
        }

        println!();
        println!(
            "  {} {}",
            "─".repeat(40).dimmed(),
            summary.one_line().dimmed()
        );
        println!();
    }

    Ok(())
}

/// List available sessions.
pub fn run_log_list() -> Result<()> {
    let reader = AuditReader::new()?;
    let sessions = reader.list_sessions()?;

    if sessions.is_empty() {
        println!();
        println!("  {} No sessions found.", "ℹ".blue());
        println!();
        return Ok(());
    }

    println!();
    println!("  Recorded sessions:");
    println!();
    for session in &sessions {
        println!("  • {}", session);
    }
    println!();
    println!(
        "  View a session: {}",
        "fleetgate log --session <id>".dimmed()
    );
    println!();

    Ok(())
}

fn format_duration(seconds: i64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}
