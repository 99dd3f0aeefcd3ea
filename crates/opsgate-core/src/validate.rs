//! Strict parse-then-check validation of model output against the tool
//! contract. Every rejection carries a stable reason code.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::contract::{
    Action, AutomationArgs, DeployArgs, ExplainArgs, RollbackArgs, Safety, ScaleArgs, ToolCall,
    ToolName,
};

const ROOT_KEYS: [&str; 3] = ["tool", "args", "safety"];
const SAFETY_KEYS: [&str; 2] = ["requires_confirmation", "reason"];

// ---------------------------------------------------------------------------
// Rejection
// ---------------------------------------------------------------------------

/// Why a model response was refused. The Display form is the reason code
/// persisted in `RequestRecord.error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("invalid_json")]
    InvalidJson { detail: String },

    #[error("schema_error:{0}")]
    Schema(SchemaError),
}

impl serde::Serialize for Rejection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("root_not_object")]
    RootNotObject,

    #[error("key_set_mismatch")]
    KeySetMismatch { keys: Vec<String> },

    #[error("tool_not_allowed:{0}")]
    ToolNotAllowed(String),

    #[error("args_not_object")]
    ArgsNotObject,

    #[error("safety_not_object")]
    SafetyNotObject,

    #[error("safety_key_set_mismatch")]
    SafetyKeySetMismatch,

    #[error("requires_confirmation_not_bool")]
    RequiresConfirmationNotBool,

    #[error("reason_not_string")]
    ReasonNotString,

    #[error("missing_required_arg:{0}")]
    MissingRequiredArg(String),

    #[error("unexpected_arg:{0}")]
    UnexpectedArg(String),

    #[error("arg_type:{0}")]
    ArgType(String),

    #[error("{0}_range")]
    Range(String),
}

impl From<SchemaError> for Rejection {
    fn from(e: SchemaError) -> Self {
        Rejection::Schema(e)
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse raw model text and validate it. The text must be exactly one
/// JSON value; surrounding prose or trailing data is `invalid_json`.
pub fn validate_response(text: &str) -> Result<ToolCall, Rejection> {
    let value: Value = serde_json::from_str(text.trim()).map_err(|e| Rejection::InvalidJson {
        detail: e.to_string(),
    })?;
    validate_value(&value)
}

/// Validate an already-parsed value.
pub fn validate_value(value: &Value) -> Result<ToolCall, Rejection> {
    let root = value.as_object().ok_or(SchemaError::RootNotObject)?;

    if !has_exact_keys(root, &ROOT_KEYS) {
        return Err(SchemaError::KeySetMismatch {
            keys: root.keys().cloned().collect(),
        }
        .into());
    }

    let tool = match &root["tool"] {
        Value::String(s) => ToolName::parse(s).ok_or_else(|| SchemaError::ToolNotAllowed(s.clone())),
        other => Err(SchemaError::ToolNotAllowed(other.to_string())),
    }?;

    let args = root["args"].as_object().ok_or(SchemaError::ArgsNotObject)?;
    let safety = check_safety(&root["safety"])?;

    check_args(tool, args)?;

    Ok(ToolCall::new(build_action(tool, args), safety))
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

fn has_exact_keys(map: &Map<String, Value>, expected: &[&str]) -> bool {
    map.len() == expected.len() && expected.iter().all(|k| map.contains_key(*k))
}

fn check_safety(value: &Value) -> Result<Safety, SchemaError> {
    let safety = value.as_object().ok_or(SchemaError::SafetyNotObject)?;
    if !has_exact_keys(safety, &SAFETY_KEYS) {
        return Err(SchemaError::SafetyKeySetMismatch);
    }
    let requires_confirmation = safety["requires_confirmation"]
        .as_bool()
        .ok_or(SchemaError::RequiresConfirmationNotBool)?;
    let reason = safety["reason"]
        .as_str()
        .ok_or(SchemaError::ReasonNotString)?
        .to_string();
    Ok(Safety {
        requires_confirmation,
        reason,
    })
}

fn check_args(tool: ToolName, args: &Map<String, Value>) -> Result<(), SchemaError> {
    let contract = tool.contract();

    for spec in contract.required {
        if !args.contains_key(spec.name) {
            return Err(SchemaError::MissingRequiredArg(spec.name.to_string()));
        }
    }

    for key in args.keys() {
        if contract.spec(key).is_none() {
            return Err(SchemaError::UnexpectedArg(key.clone()));
        }
    }

    for (key, value) in args {
        if let Some(spec) = contract.spec(key) {
            if !spec.kind.matches(value) {
                return Err(SchemaError::ArgType(key.clone()));
            }
        }
    }

    for spec in contract.all_args() {
        if spec.min.is_none() && spec.max.is_none() {
            continue;
        }
        if let Some(n) = args.get(spec.name).and_then(Value::as_i64) {
            if !spec.in_range(n) {
                return Err(SchemaError::Range(spec.name.to_string()));
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Typed construction (input already checked)
// ---------------------------------------------------------------------------

fn text(args: &Map<String, Value>, key: &str) -> String {
    args.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn opt_text(args: &Map<String, Value>, key: &str) -> Option<String> {
    args.get(key).and_then(Value::as_str).map(str::to_string)
}

fn opt_flag(args: &Map<String, Value>, key: &str) -> Option<bool> {
    args.get(key).and_then(Value::as_bool)
}

fn build_action(tool: ToolName, args: &Map<String, Value>) -> Action {
    match tool {
        ToolName::Deploy => Action::Deploy(DeployArgs {
            branch: text(args, "branch"),
            environment: text(args, "environment"),
            canary_percent: args
                .get("canary_percent")
                .and_then(Value::as_i64)
                .and_then(|n| u8::try_from(n).ok()),
            dry_run: opt_flag(args, "dry_run"),
        }),
        ToolName::Rollback => Action::Rollback(RollbackArgs {
            service: text(args, "service"),
            target_version: opt_text(args, "target_version"),
        }),
        ToolName::Scale => Action::Scale(ScaleArgs {
            service: text(args, "service"),
            replicas: args
                .get("replicas")
                .and_then(Value::as_u64)
                .unwrap_or(1),
            region: opt_text(args, "region"),
            dry_run: opt_flag(args, "dry_run"),
        }),
        ToolName::PauseAutomation => Action::PauseAutomation(AutomationArgs {
            service: text(args, "service"),
            environment: text(args, "environment"),
        }),
        ToolName::ResumeAutomation => Action::ResumeAutomation(AutomationArgs {
            service: text(args, "service"),
            environment: text(args, "environment"),
        }),
        ToolName::Explain => Action::Explain(ExplainArgs {
            command: text(args, "command"),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(value: Value) -> Result<ToolCall, Rejection> {
        validate_response(&value.to_string())
    }

    fn code(value: Value) -> String {
        check(value).unwrap_err().to_string()
    }

    fn safe() -> Value {
        json!({"requires_confirmation": false, "reason": ""})
    }

    fn deploy(args: Value) -> Value {
        json!({"tool": "deploy", "args": args, "safety": safe()})
    }

    fn scale(args: Value) -> Value {
        json!({"tool": "scale", "args": args, "safety": safe()})
    }

    #[test]
    fn valid_deploy_is_typed() {
        let call = check(deploy(json!({
            "branch": "main",
            "environment": "staging",
            "canary_percent": 25,
            "dry_run": true
        })))
        .unwrap();
        let Action::Deploy(args) = call.action() else {
            panic!("expected deploy")
        };
        assert_eq!(args.branch, "main");
        assert_eq!(args.environment, "staging");
        assert_eq!(args.canary_percent, Some(25));
        assert_eq!(args.dry_run, Some(true));
    }

    #[test]
    fn not_json() {
        assert_eq!(validate_response("").unwrap_err().to_string(), "invalid_json");
        assert_eq!(
            validate_response("sure! {\"tool\":\"explain\"}")
                .unwrap_err()
                .to_string(),
            "invalid_json"
        );
        let err = validate_response(r#"{"a":1} {"b":2}"#).unwrap_err();
        assert!(matches!(err, Rejection::InvalidJson { .. }));
    }

    #[test]
    fn root_must_be_object() {
        assert_eq!(code(json!([1, 2])), "schema_error:root_not_object");
        assert_eq!(code(json!("deploy")), "schema_error:root_not_object");
    }

    #[test]
    fn root_key_set_must_be_exact() {
        let extra = json!({
            "tool": "explain",
            "args": {"command": "ls"},
            "safety": safe(),
            "confidence": 0.9
        });
        assert_eq!(code(extra), "schema_error:key_set_mismatch");

        let missing = json!({"tool": "explain", "args": {"command": "ls"}});
        assert_eq!(code(missing), "schema_error:key_set_mismatch");

        let renamed = json!({"tool": "explain", "arguments": {"command": "ls"}, "safety": safe()});
        assert_eq!(code(renamed), "schema_error:key_set_mismatch");
    }

    #[test]
    fn tool_must_be_allowed() {
        let v = json!({"tool": "delete_cluster", "args": {}, "safety": safe()});
        assert_eq!(code(v), "schema_error:tool_not_allowed:delete_cluster");

        let v = json!({"tool": 7, "args": {}, "safety": safe()});
        assert_eq!(code(v), "schema_error:tool_not_allowed:7");
    }

    #[test]
    fn args_must_be_object() {
        let v = json!({"tool": "explain", "args": ["ls"], "safety": safe()});
        assert_eq!(code(v), "schema_error:args_not_object");
    }

    #[test]
    fn safety_shape() {
        let base = |safety: Value| json!({"tool": "explain", "args": {"command": "ls"}, "safety": safety});
        assert_eq!(code(base(json!(true))), "schema_error:safety_not_object");
        assert_eq!(
            code(base(json!({"requires_confirmation": true}))),
            "schema_error:safety_key_set_mismatch"
        );
        assert_eq!(
            code(base(json!({"requires_confirmation": true, "reason": "", "level": 3}))),
            "schema_error:safety_key_set_mismatch"
        );
        assert_eq!(
            code(base(json!({"requires_confirmation": "yes", "reason": ""}))),
            "schema_error:requires_confirmation_not_bool"
        );
        assert_eq!(
            code(base(json!({"requires_confirmation": true, "reason": null}))),
            "schema_error:reason_not_string"
        );
    }

    #[test]
    fn required_and_unexpected_args() {
        assert_eq!(
            code(deploy(json!({"branch": "main"}))),
            "schema_error:missing_required_arg:environment"
        );
        assert_eq!(
            code(deploy(json!({"branch": "main", "environment": "prod", "force": true}))),
            "schema_error:unexpected_arg:force"
        );
    }

    #[test]
    fn arg_types() {
        assert_eq!(
            code(scale(json!({"service": "web", "replicas": "6"}))),
            "schema_error:arg_type:replicas"
        );
        assert_eq!(
            code(scale(json!({"service": "web", "replicas": 6.0}))),
            "schema_error:arg_type:replicas"
        );
        assert_eq!(
            code(deploy(json!({"branch": "main", "environment": "prod", "dry_run": "yes"}))),
            "schema_error:arg_type:dry_run"
        );
    }

    #[test]
    fn canary_percent_bounds() {
        for ok in [0, 100] {
            check(deploy(json!({"branch": "m", "environment": "e", "canary_percent": ok})))
                .unwrap_or_else(|e| panic!("{ok} should pass: {e}"));
        }
        for bad in [-1, 101] {
            assert_eq!(
                code(deploy(json!({"branch": "m", "environment": "e", "canary_percent": bad}))),
                "schema_error:canary_percent_range"
            );
        }
    }

    #[test]
    fn replicas_bounds() {
        let call = check(scale(json!({"service": "web", "replicas": 1}))).unwrap();
        let Action::Scale(args) = call.action() else {
            panic!("expected scale")
        };
        assert_eq!(args.replicas, 1);
        assert_eq!(
            code(scale(json!({"service": "web", "replicas": 0}))),
            "schema_error:replicas_range"
        );
    }

    #[test]
    fn every_tool_accepts_its_minimal_args() {
        let cases = [
            ("deploy", json!({"branch": "main", "environment": "prod"})),
            ("rollback", json!({"service": "api"})),
            ("scale", json!({"service": "web", "replicas": 3})),
            ("pause_automation", json!({"service": "api", "environment": "prod"})),
            ("resume_automation", json!({"service": "api", "environment": "prod"})),
            ("explain", json!({"command": "what does deploy do"})),
        ];
        for (tool, args) in cases {
            let call = check(json!({"tool": tool, "args": args, "safety": safe()}))
                .unwrap_or_else(|e| panic!("{tool}: {e}"));
            assert_eq!(call.tool().as_str(), tool);
        }
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        let text = format!("\n  {}  \n", deploy(json!({"branch": "m", "environment": "e"})));
        assert!(validate_response(&text).is_ok());
    }
}
