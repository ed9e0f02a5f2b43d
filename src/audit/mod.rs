pub mod logger;
pub mod reader;
pub mod types;

pub use logger::AuditLogger;
pub use reader::AuditReader;
pub use types::{AuditDecision, AuditRecord, LogFilter, SessionSummary};
