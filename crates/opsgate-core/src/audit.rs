//! Append-only audit stream (`audit/ai_audit.jsonl`).
//!
//! One JSON object per line, one line per lifecycle transition. Lines are
//! never rewritten; readers tolerate garbage by skipping it.

use crate::contract::ToolName;
use crate::error::Result;
use crate::io;
use crate::ledger::{RequestRecord, RequestStatus};
use crate::paths;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    Created,
    Approved,
    Executed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Pending,
    Approved,
    Success,
    Failed,
}

impl AuditEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditEventKind::Created => "created",
            AuditEventKind::Approved => "approved",
            AuditEventKind::Executed => "executed",
        }
    }
}

impl fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AuditStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditStatus::Pending => "pending",
            AuditStatus::Approved => "approved",
            AuditStatus::Success => "success",
            AuditStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RequestStatus> for AuditStatus {
    fn from(status: RequestStatus) -> Self {
        match status {
            RequestStatus::Pending => AuditStatus::Pending,
            RequestStatus::Executed => AuditStatus::Success,
            RequestStatus::Failed => AuditStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub event: AuditEventKind,
    pub request_id: String,
    pub tool: Option<ToolName>,
    pub status: AuditStatus,
    pub actor: String,
    pub detail: Option<String>,
}

impl AuditEvent {
    /// Snapshot a record at a lifecycle transition. `detail` carries the
    /// error for failures and the result message otherwise.
    pub fn from_record(kind: AuditEventKind, record: &RequestRecord, actor: &str) -> Self {
        let status = match kind {
            AuditEventKind::Approved => AuditStatus::Approved,
            _ => record.status.into(),
        };
        let detail = match kind {
            AuditEventKind::Approved => None,
            _ => record.error.clone().or_else(|| record.result.clone()),
        };
        Self {
            timestamp: Utc::now(),
            event: kind,
            request_id: record.id.clone(),
            tool: record.tool_call.as_ref().map(|c| c.tool()),
            status,
            actor: actor.to_string(),
            detail,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn open(home: &Path) -> Self {
        Self {
            path: paths::audit_path(home),
        }
    }

    pub fn append(&self, event: &AuditEvent) -> Result<()> {
        let line = serde_json::to_string(event)?;
        io::append_line(&self.path, &line)?;
        tracing::debug!(
            request_id = %event.request_id,
            event = %event.event,
            status = %event.status,
            "audit event appended"
        );
        Ok(())
    }

    /// The last `limit` events (all of them when `None`), oldest first.
    pub fn read(&self, limit: Option<usize>) -> Result<Vec<AuditEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let mut events = Vec::new();
        for (n, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditEvent>(line) {
                Ok(ev) => events.push(ev),
                Err(e) => tracing::warn!(line = n + 1, error = %e, "skipping malformed audit line"),
            }
        }
        if let Some(limit) = limit {
            let skip = events.len().saturating_sub(limit);
            events.drain(..skip);
        }
        Ok(events)
    }
}
