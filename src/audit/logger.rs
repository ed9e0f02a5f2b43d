//! Audit trail writer — append-only JSONL files.
//!
//! One JSON object per line, written and flushed before the gateway
//! reports a decision to its caller. A failed write fails the submission
//! closed: if the trail cannot be guaranteed, the action is not reported
//! as executed.

use crate::audit::types::AuditRecord;
use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only audit writer. Writes to
/// `~/.fleetgate/logs/{session_id}.jsonl` by default.
pub struct AuditLogger {
    log_path: PathBuf,
    file: File,
    record_count: usize,
}

impl AuditLogger {
    /// Create a logger for a session under the default log directory.
    pub fn new(session_id: &str) -> Result<Self> {
        let log_dir = Self::log_directory()?;
        let log_path = log_dir.join(format!("{}.jsonl", session_id));
        Self::with_path(log_path)
    }

    /// Create a logger writing to a specific path (tests, custom dirs).
    pub fn with_path(path: impl AsRef<Path>) -> Result<Self> {
        let log_path = path.as_ref().to_path_buf();
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open audit log: {}", log_path.display()))?;

        Ok(Self {
            log_path,
            file,
            record_count: 0,
        })
    }

    /// Append one record. Flushed and synced before returning so a crash
    /// immediately after still leaves the trace of intent.
    pub fn append(&mut self, record: &AuditRecord) -> Result<()> {
        let json = serde_json::to_string(record).context("Failed to serialize audit record")?;
        writeln!(self.file, "{}", json).context("Failed to write audit record")?;
        self.file.flush().context("Failed to flush audit log")?;
        self.file
            .sync_data()
            .context("Failed to sync audit log to disk")?;
        self.record_count += 1;
        Ok(())
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Default log directory (`~/.fleetgate/logs/`).
    pub fn log_directory() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".fleetgate").join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::types::AuditDecision;
    use crate::types::Actor;
    use chrono::Utc;
    use tempfile::TempDir;

    fn record(request_id: &str, decision: AuditDecision) -> AuditRecord {
        AuditRecord {
            timestamp: Utc::now(),
            request_id: request_id.to_string(),
            session_id: "sess-test".to_string(),
            actor: Actor::Agent,
            action: "service_restart".to_string(),
            targets: vec!["vm-101".to_string()],
            tier: None,
            decision,
            outcome: None,
            rationale: "test".to_string(),
        }
    }

    #[test]
    fn write_and_parse_back() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sess.jsonl");
        let mut logger = AuditLogger::with_path(&path).unwrap();

        logger.append(&record("req-1", AuditDecision::Executed)).unwrap();
        assert_eq!(logger.record_count(), 1);

        let content = fs::read_to_string(&path).unwrap();
        let parsed: AuditRecord = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(parsed.request_id, "req-1");
        assert_eq!(parsed.decision, AuditDecision::Executed);
    }

    #[test]
    fn records_append_in_order() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sess.jsonl");
        let mut logger = AuditLogger::with_path(&path).unwrap();

        for i in 0..3 {
            logger
                .append(&record(&format!("req-{}", i), AuditDecision::Rejected))
                .unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        let ids: Vec<String> = content
            .trim()
            .lines()
            .map(|l| {
                let r: AuditRecord = serde_json::from_str(l).unwrap();
                r.request_id
            })
            .collect();
        assert_eq!(ids, vec!["req-0", "req-1", "req-2"]);
    }
}
