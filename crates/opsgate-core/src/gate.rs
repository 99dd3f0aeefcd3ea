use serde::{Deserialize, Serialize};
use std::fmt;

use crate::contract::ToolCall;

// ---------------------------------------------------------------------------
// GateDecision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum GateDecision {
    Execute,
    Hold(HoldReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldReason {
    /// The model flagged the call; only a human approval can release it.
    RequiresConfirmation,
    /// The call looks safe, but neither the caller nor policy opted in.
    AwaitingApproval,
}

impl fmt::Display for HoldReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HoldReason::RequiresConfirmation => f.write_str("requires_confirmation"),
            HoldReason::AwaitingApproval => f.write_str("awaiting_approval"),
        }
    }
}

// ---------------------------------------------------------------------------
// SafetyGate
// ---------------------------------------------------------------------------

/// Decides whether a validated call may run without a human approval step.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyGate {
    /// Standing operator policy (`auto_execute_safe` in config).
    auto_execute_safe: bool,
}

impl SafetyGate {
    pub fn new(auto_execute_safe: bool) -> Self {
        Self { auto_execute_safe }
    }

    /// Evaluated once when the request is created.
    pub fn on_submit(&self, call: &ToolCall, caller_opted_in: bool) -> GateDecision {
        if call.safety().requires_confirmation {
            return GateDecision::Hold(HoldReason::RequiresConfirmation);
        }
        if caller_opted_in || self.auto_execute_safe {
            GateDecision::Execute
        } else {
            GateDecision::Hold(HoldReason::AwaitingApproval)
        }
    }

    /// A human approved the request; that always authorizes execution.
    pub fn on_approval(&self, _call: &ToolCall) -> GateDecision {
        GateDecision::Execute
    }
}
