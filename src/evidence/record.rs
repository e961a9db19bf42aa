/// Evidence record: the single line appended per invocation
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvidenceRecord {
    pub timestamp: DateTime<Utc>,
    /// Kernel pid, for matching against host-side process listings
    pub os_pid: u32,
    /// Identifier minted once per process state
    pub process_id: Uuid,
    pub invocation: u64,
    pub request_id: String,
    pub age_ms: u64,
    pub leaked_resources: usize,
}

impl EvidenceRecord {
    /// Render as one newline-terminated line
    pub fn to_line(&self) -> String {
        format!("{}\n", self)
    }
}

impl std::fmt::Display for EvidenceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} pid={} process_id={} invocation={} request_id={} age_ms={} leaked={}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.os_pid,
            self.process_id,
            self.invocation,
            self.request_id,
            self.age_ms,
            self.leaked_resources
        )
    }
}
