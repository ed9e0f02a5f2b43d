//! Audit trail reader — filter and display session records.
//!
//! Backs the `fleetgate log` command: what did the gateway decide, for
//! whom, and why.

use crate::audit::types::{AuditDecision, AuditRecord, LogFilter, SessionSummary};
use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads and queries audit log files.
pub struct AuditReader {
    log_dir: PathBuf,
}

impl AuditReader {
    /// Reader over the default log directory.
    pub fn new() -> Result<Self> {
        let log_dir = crate::audit::logger::AuditLogger::log_directory()?;
        Ok(Self { log_dir })
    }

    /// Reader over a specific directory (for testing).
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            log_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Read all records from a session's file.
    pub fn read_session(&self, session_id: &str) -> Result<Vec<AuditRecord>> {
        let path = self.log_dir.join(format!("{}.jsonl", session_id));
        self.read_file(&path)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<AuditRecord>> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read audit log: {}", path.display()))?;

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(i, line)| {
                serde_json::from_str(line)
                    .with_context(|| format!("Failed to parse audit record at line {}", i + 1))
            })
            .collect()
    }

    /// Read records from the most recently written session.
    pub fn read_latest_session(&self) -> Result<Vec<AuditRecord>> {
        match self.find_latest_session()? {
            Some(path) => self.read_file(&path),
            None => Ok(Vec::new()),
        }
    }

    fn find_latest_session(&self) -> Result<Option<PathBuf>> {
        if !self.log_dir.exists() {
            return Ok(None);
        }

        let mut files: Vec<PathBuf> = fs::read_dir(&self.log_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map_or(false, |e| e == "jsonl"))
            .collect();

        files.sort_by(|a, b| {
            let a_time = fs::metadata(a).and_then(|m| m.modified()).ok();
            let b_time = fs::metadata(b).and_then(|m| m.modified()).ok();
            b_time.cmp(&a_time)
        });

        Ok(files.into_iter().next())
    }

    /// List all recorded session ids.
    pub fn list_sessions(&self) -> Result<Vec<String>> {
        if !self.log_dir.exists() {
            return Ok(Vec::new());
        }

        let mut sessions: Vec<String> = fs::read_dir(&self.log_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "jsonl"))
            .filter_map(|e| {
                e.path()
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
            })
            .collect();

        sessions.sort();
        Ok(sessions)
    }

    /// Apply filter criteria to a set of records.
    pub fn filter_records(records: &[AuditRecord], filter: &LogFilter) -> Vec<AuditRecord> {
        records
            .iter()
            .filter(|r| {
                if let Some(actor) = filter.actor {
                    if r.actor != actor {
                        return false;
                    }
                }
                if let Some(decision) = filter.decision {
                    if r.decision != decision {
                        return false;
                    }
                }
                true
            })
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Summarize a session's records.
    pub fn summarize(records: &[AuditRecord]) -> SessionSummary {
        let mut summary = SessionSummary::default();

        if let Some(first) = records.first() {
            summary.session_id = first.session_id.clone();
            summary.start_time = Some(first.timestamp);
        }
        if let Some(last) = records.last() {
            summary.end_time = Some(last.timestamp);
        }

        summary.total = records.len();
        for record in records {
            match record.decision {
                AuditDecision::Executed => summary.executed += 1,
                AuditDecision::ExecutionFailed => summary.failed += 1,
                AuditDecision::Pending => summary.pending += 1,
                AuditDecision::Rejected => summary.rejected += 1,
                AuditDecision::Blocked => summary.blocked += 1,
            }
        }

        summary
    }

    /// Pretty-print a record for terminal display.
    pub fn format_record(record: &AuditRecord) -> String {
        let timestamp = record.timestamp.format("%H:%M:%S").to_string();
        let decision_str = match record.decision {
            AuditDecision::Executed => "EXECUTED".green().to_string(),
            AuditDecision::ExecutionFailed => "FAILED".red().to_string(),
            AuditDecision::Pending => "PENDING".yellow().to_string(),
            AuditDecision::Rejected => "REJECTED".red().to_string(),
            AuditDecision::Blocked => "BLOCKED".magenta().to_string(),
        };

        let mut line = format!(
            "[{}] {} {} [{}] -> {}",
            timestamp.dimmed(),
            decision_str,
            record.action.bold(),
            record.actor,
            record.targets.join(", ")
        );

        if let Some(tier) = record.tier {
            line.push_str(&format!(" ({})", tier.to_string().dimmed()));
        }

        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::logger::AuditLogger;
    use crate::types::Actor;
    use chrono::Utc;
    use tempfile::TempDir;

    fn record(actor: Actor, decision: AuditDecision) -> AuditRecord {
        AuditRecord {
            timestamp: Utc::now(),
            request_id: "req".to_string(),
            session_id: "sess-1".to_string(),
            actor,
            action: "vm_status".to_string(),
            targets: vec!["vm-101".to_string()],
            tier: None,
            decision,
            outcome: None,
            rationale: "test".to_string(),
        }
    }

    #[test]
    fn filter_by_actor_and_decision() {
        let records = vec![
            record(Actor::Human, AuditDecision::Executed),
            record(Actor::AutonomousRemediation, AuditDecision::Blocked),
            record(Actor::Agent, AuditDecision::Executed),
        ];

        let filter = LogFilter {
            actor: Some(Actor::AutonomousRemediation),
            ..Default::default()
        };
        assert_eq!(AuditReader::filter_records(&records, &filter).len(), 1);

        let filter = LogFilter {
            decision: Some(AuditDecision::Executed),
            ..Default::default()
        };
        assert_eq!(AuditReader::filter_records(&records, &filter).len(), 2);
    }

    #[test]
    fn summarize_counts() {
        let records = vec![
            record(Actor::Human, AuditDecision::Executed),
            record(Actor::Agent, AuditDecision::Rejected),
            record(Actor::Agent, AuditDecision::Rejected),
        ];
        let summary = AuditReader::summarize(&records);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.executed, 1);
        assert_eq!(summary.rejected, 2);
        assert_eq!(summary.session_id, "sess-1");
    }

    #[test]
    fn round_trip_via_logger() {
        let tmp = TempDir::new().unwrap();
        let mut logger = AuditLogger::with_path(tmp.path().join("sess-1.jsonl")).unwrap();
        logger.append(&record(Actor::Human, AuditDecision::Executed)).unwrap();

        let reader = AuditReader::with_dir(tmp.path());
        let records = reader.read_session("sess-1").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, "vm_status");
    }
}
