//! The fixed tool contract: which actions exist, what arguments each one
//! takes, and the typed [`ToolCall`] produced by validation.
//!
//! A `ToolCall` has no public constructor. It comes out of
//! [`crate::validate::validate_response`] or out of deserialization, and
//! deserialization runs the same validator (`serde(try_from)`), so a
//! record loaded from disk is re-checked against the contract.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::validate::Rejection;

// ---------------------------------------------------------------------------
// ToolName
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    Deploy,
    Rollback,
    Scale,
    PauseAutomation,
    ResumeAutomation,
    Explain,
}

impl ToolName {
    pub fn all() -> &'static [ToolName] {
        &[
            ToolName::Deploy,
            ToolName::Rollback,
            ToolName::Scale,
            ToolName::PauseAutomation,
            ToolName::ResumeAutomation,
            ToolName::Explain,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::Deploy => "deploy",
            ToolName::Rollback => "rollback",
            ToolName::Scale => "scale",
            ToolName::PauseAutomation => "pause_automation",
            ToolName::ResumeAutomation => "resume_automation",
            ToolName::Explain => "explain",
        }
    }

    pub fn parse(s: &str) -> Option<ToolName> {
        ToolName::all().iter().copied().find(|t| t.as_str() == s)
    }

    pub fn contract(self) -> &'static ToolContract {
        match self {
            ToolName::Deploy => &DEPLOY,
            ToolName::Rollback => &ROLLBACK,
            ToolName::Scale => &SCALE,
            ToolName::PauseAutomation => &PAUSE_AUTOMATION,
            ToolName::ResumeAutomation => &RESUME_AUTOMATION,
            ToolName::Explain => &EXPLAIN,
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Argument specs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    String,
    Integer,
    Boolean,
}

impl ArgKind {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            ArgKind::String => value.is_string(),
            // Floats are rejected even when integral (6.0).
            ArgKind::Integer => value.as_i64().is_some(),
            ArgKind::Boolean => value.is_boolean(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
    /// Inclusive bounds, integer arguments only.
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl ArgSpec {
    const fn plain(name: &'static str, kind: ArgKind) -> Self {
        Self {
            name,
            kind,
            min: None,
            max: None,
        }
    }

    const fn ranged(name: &'static str, min: Option<i64>, max: Option<i64>) -> Self {
        Self {
            name,
            kind: ArgKind::Integer,
            min,
            max,
        }
    }

    pub fn in_range(&self, n: i64) -> bool {
        self.min.map_or(true, |min| n >= min) && self.max.map_or(true, |max| n <= max)
    }
}

#[derive(Debug)]
pub struct ToolContract {
    pub tool: ToolName,
    pub required: &'static [ArgSpec],
    pub optional: &'static [ArgSpec],
    /// Extra guidance rendered into the prompt.
    pub hint: Option<&'static str>,
}

impl ToolContract {
    pub fn spec(&self, name: &str) -> Option<&ArgSpec> {
        self.required
            .iter()
            .chain(self.optional.iter())
            .find(|s| s.name == name)
    }

    pub fn all_args(&self) -> impl Iterator<Item = &ArgSpec> {
        self.required.iter().chain(self.optional.iter())
    }
}

static DEPLOY: ToolContract = ToolContract {
    tool: ToolName::Deploy,
    required: &[
        ArgSpec::plain("branch", ArgKind::String),
        ArgSpec::plain("environment", ArgKind::String),
    ],
    optional: &[
        ArgSpec::ranged("canary_percent", Some(0), Some(100)),
        ArgSpec::plain("dry_run", ArgKind::Boolean),
    ],
    hint: Some("environment must match pipeline name"),
};

static ROLLBACK: ToolContract = ToolContract {
    tool: ToolName::Rollback,
    required: &[ArgSpec::plain("service", ArgKind::String)],
    optional: &[ArgSpec::plain("target_version", ArgKind::String)],
    hint: Some("service must match pipeline name"),
};

static SCALE: ToolContract = ToolContract {
    tool: ToolName::Scale,
    required: &[
        ArgSpec::plain("service", ArgKind::String),
        ArgSpec::ranged("replicas", Some(1), None),
    ],
    optional: &[
        ArgSpec::plain("region", ArgKind::String),
        ArgSpec::plain("dry_run", ArgKind::Boolean),
    ],
    hint: None,
};

static PAUSE_AUTOMATION: ToolContract = ToolContract {
    tool: ToolName::PauseAutomation,
    required: &[
        ArgSpec::plain("service", ArgKind::String),
        ArgSpec::plain("environment", ArgKind::String),
    ],
    optional: &[],
    hint: None,
};

static RESUME_AUTOMATION: ToolContract = ToolContract {
    tool: ToolName::ResumeAutomation,
    required: &[
        ArgSpec::plain("service", ArgKind::String),
        ArgSpec::plain("environment", ArgKind::String),
    ],
    optional: &[],
    hint: None,
};

static EXPLAIN: ToolContract = ToolContract {
    tool: ToolName::Explain,
    required: &[ArgSpec::plain("command", ArgKind::String)],
    optional: &[],
    hint: None,
};

// ---------------------------------------------------------------------------
// Typed arguments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeployArgs {
    pub branch: String,
    pub environment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canary_percent: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollbackArgs {
    pub service: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaleArgs {
    pub service: String,
    pub replicas: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
}

/// Arguments shared by pause/resume automation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutomationArgs {
    pub service: String,
    pub environment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplainArgs {
    pub command: String,
}

/// One allowed action with its typed arguments.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tool", content = "args", rename_all = "snake_case")]
pub enum Action {
    Deploy(DeployArgs),
    Rollback(RollbackArgs),
    Scale(ScaleArgs),
    PauseAutomation(AutomationArgs),
    ResumeAutomation(AutomationArgs),
    Explain(ExplainArgs),
}

impl Action {
    pub fn tool(&self) -> ToolName {
        match self {
            Action::Deploy(_) => ToolName::Deploy,
            Action::Rollback(_) => ToolName::Rollback,
            Action::Scale(_) => ToolName::Scale,
            Action::PauseAutomation(_) => ToolName::PauseAutomation,
            Action::ResumeAutomation(_) => ToolName::ResumeAutomation,
            Action::Explain(_) => ToolName::Explain,
        }
    }
}

// ---------------------------------------------------------------------------
// Safety / ToolCall
// ---------------------------------------------------------------------------

/// The model's own assessment of whether a human should confirm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Safety {
    pub requires_confirmation: bool,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct ToolCall {
    action: Action,
    safety: Safety,
}

impl ToolCall {
    pub(crate) fn new(action: Action, safety: Safety) -> Self {
        Self { action, safety }
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn safety(&self) -> &Safety {
        &self.safety
    }

    pub fn tool(&self) -> ToolName {
        self.action.tool()
    }

    /// The wire shape `{tool, args, safety}`.
    pub fn to_value(&self) -> Value {
        let mut value = serde_json::to_value(&self.action).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            map.insert(
                "safety".to_string(),
                serde_json::json!({
                    "requires_confirmation": self.safety.requires_confirmation,
                    "reason": self.safety.reason,
                }),
            );
        }
        value
    }
}

impl TryFrom<Value> for ToolCall {
    type Error = Rejection;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        crate::validate::validate_value(&value)
    }
}

impl From<ToolCall> for Value {
    fn from(call: ToolCall) -> Self {
        call.to_value()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_names_are_stable() {
        let names: Vec<_> = ToolName::all().iter().map(|t| t.as_str()).collect();
        assert_eq!(
            names,
            [
                "deploy",
                "rollback",
                "scale",
                "pause_automation",
                "resume_automation",
                "explain"
            ]
        );
        for t in ToolName::all() {
            assert_eq!(ToolName::parse(t.as_str()), Some(*t));
            assert_eq!(t.contract().tool, *t);
        }
        assert_eq!(ToolName::parse("shutdown"), None);
    }

    #[test]
    fn contract_ranges() {
        let canary = DEPLOY.spec("canary_percent").unwrap();
        assert!(canary.in_range(0));
        assert!(canary.in_range(100));
        assert!(!canary.in_range(-1));
        assert!(!canary.in_range(101));

        let replicas = SCALE.spec("replicas").unwrap();
        assert!(replicas.in_range(1));
        assert!(replicas.in_range(10_000));
        assert!(!replicas.in_range(0));
    }

    #[test]
    fn integer_kind_rejects_floats_and_bools() {
        assert!(ArgKind::Integer.matches(&json!(6)));
        assert!(!ArgKind::Integer.matches(&json!(6.0)));
        assert!(!ArgKind::Integer.matches(&json!(true)));
        assert!(!ArgKind::Integer.matches(&json!("6")));
    }

    #[test]
    fn tool_call_value_shape_omits_absent_optionals() {
        let call = ToolCall::new(
            Action::Scale(ScaleArgs {
                service: "web".into(),
                replicas: 6,
                region: None,
                dry_run: None,
            }),
            Safety {
                requires_confirmation: false,
                reason: String::new(),
            },
        );
        let value = call.to_value();
        assert_eq!(
            value,
            json!({
                "tool": "scale",
                "args": {"service": "web", "replicas": 6},
                "safety": {"requires_confirmation": false, "reason": ""}
            })
        );
    }

    #[test]
    fn deserialization_revalidates() {
        let bad = json!({
            "tool": "scale",
            "args": {"service": "web", "replicas": 0},
            "safety": {"requires_confirmation": false, "reason": ""}
        });
        let err = serde_json::from_value::<ToolCall>(bad).unwrap_err();
        assert!(err.to_string().contains("replicas_range"));
    }

    #[test]
    fn yaml_round_trip_preserves_call() {
        let value = json!({
            "tool": "rollback",
            "args": {"service": "api", "target_version": "v1.2.3"},
            "safety": {"requires_confirmation": true, "reason": "prod change"}
        });
        let call: ToolCall = serde_json::from_value(value).unwrap();
        let yaml = serde_yaml::to_string(&call).unwrap();
        let back: ToolCall = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, call);
        assert_eq!(back.tool(), ToolName::Rollback);
        assert!(back.safety().requires_confirmation);
    }
}
