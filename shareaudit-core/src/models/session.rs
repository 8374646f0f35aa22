use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of one orchestrator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(SessionStatus::Running),
            "completed" => Ok(SessionStatus::Completed),
            "failed" => Ok(SessionStatus::Failed),
            other => Err(format!("unknown session status: {other}")),
        }
    }
}

/// One orchestrator run. `end_time` and the totals are `Some`/accurate iff
/// `status != Running` — callers must not read them while a run is live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSession {
    pub id: Uuid,
    pub domain: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_hosts: u64,
    pub total_shares: u64,
    pub total_sensitive: u64,
    pub status: SessionStatus,
}

impl ScanSession {
    pub fn new(id: Uuid, domain: impl Into<String>) -> Self {
        Self {
            id,
            domain: domain.into(),
            start_time: Utc::now(),
            end_time: None,
            total_hosts: 0,
            total_shares: 0,
            total_sensitive: 0,
            status: SessionStatus::Running,
        }
    }

    pub fn seal(&mut self, totals: SessionTotals, status: SessionStatus) {
        debug_assert_ne!(status, SessionStatus::Running, "seal must set a terminal status");
        self.total_hosts = totals.total_hosts;
        self.total_shares = totals.total_shares;
        self.total_sensitive = totals.total_sensitive;
        self.status = status;
        self.end_time = Some(Utc::now());
    }
}

/// Aggregate counters handed to `end_session` at finalization time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionTotals {
    pub total_hosts: u64,
    pub total_shares: u64,
    pub total_sensitive: u64,
}
