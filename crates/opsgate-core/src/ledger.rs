//! Durable request lifecycle records.
//!
//! Layout:
//!   requests/<id>.yaml   one RequestRecord per file
//!   requests/<id>.lock   advisory lock taken while an approval holds the record
//!
//! Ids are `ai-` plus 8 random hex digits, created with no-clobber
//! semantics so an id is never handed out twice.

use crate::contract::ToolCall;
use crate::error::{OpsgateError, Result};
use crate::io::{self, LockFile};
use crate::paths;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Executed,
    Failed,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Executed | RequestStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Executed => "executed",
            RequestStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: String,
    pub request_text: String,
    /// `None` when the model output was rejected.
    pub tool_call: Option<ToolCall>,
    pub raw_model_output: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub executed_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub error: Option<String>,
    /// Success message of the executed action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl RequestRecord {
    pub fn tool_name(&self) -> Option<&'static str> {
        self.tool_call.as_ref().map(|c| c.tool().as_str())
    }

    /// Move a pending record to its terminal state. Errors if the record
    /// already reached one.
    pub fn complete(&mut self, outcome: std::result::Result<String, String>) -> Result<()> {
        if self.status.is_terminal() {
            return Err(OpsgateError::AlreadyCompleted(self.id.clone()));
        }
        match outcome {
            Ok(message) => {
                self.status = RequestStatus::Executed;
                self.result = Some(message);
                self.error = None;
            }
            Err(reason) => {
                self.status = RequestStatus::Failed;
                self.error = Some(reason);
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RequestLedger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RequestLedger {
    home: PathBuf,
}

impl RequestLedger {
    pub fn open(home: &Path) -> Self {
        Self {
            home: home.to_path_buf(),
        }
    }

    /// Persist a new record under a freshly generated id. The id field of
    /// `record` is overwritten.
    pub fn create(&self, mut record: RequestRecord) -> Result<RequestRecord> {
        loop {
            record.id = generate_id();
            let data = serde_yaml::to_string(&record)?;
            if io::atomic_create(&paths::request_path(&self.home, &record.id), data.as_bytes())? {
                tracing::debug!(request_id = %record.id, "request recorded");
                return Ok(record);
            }
            tracing::debug!(request_id = %record.id, "id collision, regenerating");
        }
    }

    pub fn get(&self, id: &str) -> Result<RequestRecord> {
        if !paths::is_valid_request_id(id) {
            return Err(OpsgateError::RequestNotFound(id.to_string()));
        }
        let path = paths::request_path(&self.home, id);
        if !path.exists() {
            return Err(OpsgateError::RequestNotFound(id.to_string()));
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Overwrite an existing record. Callers mutating a record hold its
    /// lock (see [`RequestLedger::lock`]).
    pub fn save(&self, record: &RequestRecord) -> Result<()> {
        let data = serde_yaml::to_string(record)?;
        io::atomic_write(&paths::request_path(&self.home, &record.id), data.as_bytes())
    }

    /// Exclusive per-record lock for read-check-mutate sequences.
    pub fn lock(&self, id: &str) -> Result<LockFile> {
        if !paths::is_valid_request_id(id) {
            return Err(OpsgateError::RequestNotFound(id.to_string()));
        }
        LockFile::acquire(&paths::request_lock_path(&self.home, id))
    }

    /// All records, oldest first. Unreadable files are skipped with a
    /// warning.
    pub fn list(&self) -> Result<Vec<RequestRecord>> {
        let dir = paths::requests_dir(&self.home);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let parsed = std::fs::read_to_string(&path)
                .map_err(OpsgateError::from)
                .and_then(|c| serde_yaml::from_str::<RequestRecord>(&c).map_err(Into::into));
            match parsed {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable request record")
                }
            }
        }
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }
}

fn generate_id() -> String {
    let n: u32 = rand::thread_rng().gen();
    format!("ai-{n:08x}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
