//! The governance service: text in, audited action out.
//!
//! ```text
//! submit(text)
//!   ├─ build_prompt ─► ModelGateway ─► validate_response
//!   │      transport error ──► Err, nothing recorded
//!   ├─ RequestLedger::create  (pending, or failed on rejection)
//!   ├─ AuditLog: created
//!   └─ SafetyGate::on_submit
//!          Hold    ──► stays pending until approve(id)
//!          Execute ──► ActionExecutor ─► ledger update ─► AuditLog: executed
//! ```

use crate::audit::{AuditEvent, AuditEventKind, AuditLog};
use crate::config::{AiConfig, LlmOverrides, LlmSettings};
use crate::contract::ToolCall;
use crate::error::{OpsgateError, Result};
use crate::executor::{ActionExecutor, CommandRunner, SystemRunner};
use crate::gate::{GateDecision, SafetyGate};
use crate::ledger::{RequestLedger, RequestRecord, RequestStatus};
use crate::prompt::build_prompt;
use crate::validate::{validate_response, Rejection};
use chrono::Utc;
use model_gateway::{HttpGateway, ModelGateway};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result of a parse-only run: the model was called, nothing was recorded.
#[derive(Debug, Clone, Serialize)]
pub struct ParseOutcome {
    pub tool_call: Option<ToolCall>,
    pub rejection: Option<Rejection>,
    pub raw_model_output: String,
    pub provider: String,
    pub model: String,
    pub latency_ms: u64,
}

impl ParseOutcome {
    pub fn is_valid(&self) -> bool {
        self.tool_call.is_some()
    }
}

pub struct Governor {
    home: PathBuf,
    gateway: Box<dyn ModelGateway>,
    executor: ActionExecutor,
    ledger: RequestLedger,
    audit: AuditLog,
    actor: String,
}

impl Governor {
    pub fn new(
        home: &Path,
        gateway: Box<dyn ModelGateway>,
        runner: Arc<dyn CommandRunner>,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            home: home.to_path_buf(),
            gateway,
            executor: ActionExecutor::for_home(home, runner),
            ledger: RequestLedger::open(home),
            audit: AuditLog::open(home),
            actor: actor.into(),
        }
    }

    /// Production wiring: HTTP gateway, real processes, `$USER` as actor.
    pub fn open(home: &Path) -> Self {
        Self::new(
            home,
            Box::new(HttpGateway::new()),
            Arc::new(SystemRunner),
            current_actor(),
        )
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    // ─── parse ─────────────────────────────────────────────────────────

    pub fn parse(&self, text: &str, overrides: &LlmOverrides) -> Result<ParseOutcome> {
        let config = AiConfig::load(&self.home)?;
        self.call_model(&config, text, overrides)
    }

    fn call_model(&self, config: &AiConfig, text: &str, overrides: &LlmOverrides) -> Result<ParseOutcome> {
        let settings = LlmSettings::resolve(config, overrides);
        let request = settings.to_gateway_request();
        let prompt = build_prompt(text);

        let completion = self.gateway.complete(&request, &prompt)?;
        let latency_ms = u64::try_from(completion.latency.as_millis()).unwrap_or(u64::MAX);
        let (tool_call, rejection) = match validate_response(&completion.text) {
            Ok(call) => (Some(call), None),
            Err(rejection) => {
                tracing::warn!(reason = %rejection, "model output rejected");
                (None, Some(rejection))
            }
        };

        Ok(ParseOutcome {
            tool_call,
            rejection,
            raw_model_output: completion.text,
            provider: settings.provider,
            model: settings.model,
            latency_ms,
        })
    }

    // ─── submit ────────────────────────────────────────────────────────

    /// Run the full pipeline for one request. Only a transport failure
    /// (or a storage failure) is an `Err`; rejections and execution
    /// failures come back as a `failed` record.
    pub fn submit(&self, text: &str, overrides: &LlmOverrides, auto_execute: bool) -> Result<RequestRecord> {
        let config = AiConfig::load(&self.home)?;
        let parsed = self.call_model(&config, text, overrides)?;

        let status = if parsed.is_valid() {
            RequestStatus::Pending
        } else {
            RequestStatus::Failed
        };
        let record = self.ledger.create(RequestRecord {
            id: String::new(),
            request_text: text.to_string(),
            tool_call: parsed.tool_call,
            raw_model_output: parsed.raw_model_output,
            status,
            created_at: Utc::now(),
            approved_at: None,
            executed_at: None,
            created_by: self.actor.clone(),
            error: parsed.rejection.map(|r| r.to_string()),
            result: None,
            provider: Some(parsed.provider),
            model: Some(parsed.model),
            latency_ms: Some(parsed.latency_ms),
        })?;
        self.record_event(AuditEventKind::Created, &record)?;
        tracing::info!(request_id = %record.id, status = %record.status, "request created");

        let Some(call) = record.tool_call.clone() else {
            return Ok(record);
        };
        match SafetyGate::new(config.auto_execute_safe).on_submit(&call, auto_execute) {
            GateDecision::Hold(reason) => {
                tracing::info!(request_id = %record.id, %reason, "request held for approval");
                Ok(record)
            }
            GateDecision::Execute => {
                let _lock = self.ledger.lock(&record.id)?;
                self.execute(record, &call)
            }
        }
    }

    // ─── approve ───────────────────────────────────────────────────────

    /// Approve and execute a pending request. The record lock is held from
    /// the status check until the outcome is persisted.
    pub fn approve(&self, id: &str) -> Result<RequestRecord> {
        let _lock = self.ledger.lock(id)?;
        let mut record = self.ledger.get(id)?;
        if record.status.is_terminal() {
            return Err(OpsgateError::AlreadyCompleted(id.to_string()));
        }

        // `submit` stores unparseable output as failed, so only a
        // hand-edited pending record lands here.
        let Some(call) = record.tool_call.clone() else {
            record.approved_at = Some(Utc::now());
            record.complete(Err("tool_call_missing".to_string()))?;
            self.ledger.save(&record)?;
            self.record_event(AuditEventKind::Executed, &record)?;
            return Ok(record);
        };

        self.record_event(AuditEventKind::Approved, &record)?;
        record.approved_at = Some(Utc::now());
        match SafetyGate::default().on_approval(&call) {
            GateDecision::Execute => self.execute(record, &call),
            GateDecision::Hold(reason) => {
                tracing::warn!(request_id = %id, %reason, "approval did not release request");
                Ok(record)
            }
        }
    }

    // ─── queries ───────────────────────────────────────────────────────

    pub fn list(&self) -> Result<Vec<RequestRecord>> {
        self.ledger.list()
    }

    pub fn show(&self, id: &str) -> Result<RequestRecord> {
        self.ledger.get(id)
    }

    pub fn audit(&self, limit: Option<usize>) -> Result<Vec<AuditEvent>> {
        self.audit.read(limit)
    }

    // ─── internals ─────────────────────────────────────────────────────

    /// Caller holds the record lock.
    fn execute(&self, mut record: RequestRecord, call: &ToolCall) -> Result<RequestRecord> {
        let outcome = self.executor.execute(call);
        let now = Utc::now();
        record.approved_at.get_or_insert(now);
        record.executed_at = Some(now);
        record.complete(outcome.into_result())?;
        self.ledger.save(&record)?;
        self.record_event(AuditEventKind::Executed, &record)?;
        tracing::info!(
            request_id = %record.id,
            tool = %call.tool(),
            status = %record.status,
            "request executed"
        );
        Ok(record)
    }

    fn record_event(&self, kind: AuditEventKind, record: &RequestRecord) -> Result<()> {
        self.audit
            .append(&AuditEvent::from_record(kind, record, &self.actor))
    }
}

/// `$USER`, else `unknown`.
pub fn current_actor() -> String {
    std::env::var("USER")
        .ok()
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
