#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

const LLM_ENV: [&str; 5] = [
    "OPSGATE_LLM_PROVIDER",
    "OPSGATE_LLM_BASE_URL",
    "OPSGATE_LLM_MODEL",
    "OPSGATE_LLM_TIMEOUT",
    "OPSGATE_LLM_API_KEY",
];

fn opsgate(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("opsgate").unwrap();
    cmd.current_dir(dir.path())
        .env("OPSGATE_HOME", dir.path())
        .env("USER", "integration")
        .env_remove("OPSGATE_SCRIPTS_DIR");
    for key in LLM_ENV {
        cmd.env_remove(key);
    }
    cmd
}

/// Single-prompt model endpoint answering every call with `tool_call`.
fn model_server(tool_call: &Value) -> (mockito::ServerGuard, mockito::Mock) {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/api/generate")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "response": tool_call.to_string() }).to_string())
        .create();
    (server, mock)
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

// ---------------------------------------------------------------------------
// list / show / approve on an empty home
// ---------------------------------------------------------------------------

#[test]
fn list_on_fresh_home_is_empty() {
    let dir = TempDir::new().unwrap();
    opsgate(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No requests."));

    let output = opsgate(&dir).args(["--json", "list"]).output().unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output), json!([]));
}

#[test]
fn approve_unknown_request_fails() {
    let dir = TempDir::new().unwrap();
    opsgate(&dir)
        .args(["approve", "ai-deadbeef"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: not_found"));
}

#[test]
fn show_rejects_path_like_ids() {
    let dir = TempDir::new().unwrap();
    opsgate(&dir)
        .args(["show", "../config/ai"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not_found"));
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn config_show_defaults() {
    let dir = TempDir::new().unwrap();
    opsgate(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ollama"))
        .stdout(predicate::str::contains("qwen3-coder"))
        .stdout(predicate::str::contains("(not set)"));
}

#[test]
fn config_set_masks_and_clears_api_key() {
    let dir = TempDir::new().unwrap();
    opsgate(&dir)
        .args(["config", "set", "--api-key", "sk-very-secret", "--model", "llama3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sk-very-secret").not());

    let output = opsgate(&dir).args(["--json", "config", "show"]).output().unwrap();
    let shown = stdout_json(&output);
    assert_eq!(shown["api_key"], "***");
    assert_eq!(shown["model"], "llama3");

    let on_disk = std::fs::read_to_string(dir.path().join("config/ai.yaml")).unwrap();
    assert!(on_disk.contains("sk-very-secret"));

    opsgate(&dir)
        .args(["config", "set", "--api-key", ""])
        .assert()
        .success();
    let output = opsgate(&dir).args(["--json", "config", "show"]).output().unwrap();
    assert!(stdout_json(&output)["api_key"].is_null());
}

#[test]
fn config_set_rejects_unknown_provider() {
    let dir = TempDir::new().unwrap();
    opsgate(&dir)
        .args(["config", "set", "--provider", "carrier-pigeon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported_provider:carrier-pigeon"));
    assert!(!dir.path().join("config/ai.yaml").exists());
}

// ---------------------------------------------------------------------------
// request → approve against a mock model
// ---------------------------------------------------------------------------

#[test]
fn request_then_approve_explain() {
    let dir = TempDir::new().unwrap();
    let (server, mock) = model_server(&json!({
        "tool": "explain",
        "args": {"command": "docker ps"},
        "safety": {"requires_confirmation": false, "reason": "read only"}
    }));
    let endpoint = format!("{}/api/generate", server.url());

    let output = opsgate(&dir)
        .args(["--json", "request", "what", "does", "docker", "ps", "do"])
        .args(["--base-url", endpoint.as_str()])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let record = stdout_json(&output);
    assert_eq!(record["status"], "pending");
    assert_eq!(record["created_by"], "integration");
    assert_eq!(record["tool_call"]["tool"], "explain");
    let id = record["id"].as_str().unwrap().to_string();
    mock.assert();

    opsgate(&dir)
        .args(["approve", id.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("explain_only"));

    opsgate(&dir)
        .args(["approve", id.as_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already_completed"));

    let output = opsgate(&dir).args(["--json", "audit"]).output().unwrap();
    let events: Vec<String> = stdout_json(&output)
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["event"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(events, vec!["created", "approved", "executed"]);
}

#[test]
fn auto_request_scale_without_manifest_is_recorded_failed() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("config")).unwrap();
    std::fs::write(dir.path().join("config/pipeline.json"), r#"{"web": {}}"#).unwrap();
    let (server, _mock) = model_server(&json!({
        "tool": "scale",
        "args": {"service": "web", "replicas": 6},
        "safety": {"requires_confirmation": false, "reason": ""}
    }));

    let output = opsgate(&dir)
        .args(["--json", "request", "--auto", "scale", "web", "to", "6"])
        .env("OPSGATE_LLM_BASE_URL", format!("{}/api/generate", server.url()))
        .output()
        .unwrap();
    assert!(output.status.success());
    let record = stdout_json(&output);
    assert_eq!(record["status"], "failed");
    assert_eq!(record["error"], "scale_compose_file_not_found");

    opsgate(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("failed"))
        .stdout(predicate::str::contains("scale"));
}

#[test]
fn parse_reports_rejection_code() {
    let dir = TempDir::new().unwrap();
    let (server, _mock) = model_server(&json!({
        "tool": "deploy",
        "args": {"branch": "main", "environment": "prod", "canary_percent": 101},
        "safety": {"requires_confirmation": true, "reason": ""}
    }));

    opsgate(&dir)
        .args(["parse", "canary", "everything"])
        .args(["--base-url", format!("{}/api/generate", server.url()).as_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("schema_error:canary_percent_range"));
    assert!(!dir.path().join("requests").exists());
}

#[test]
fn unreachable_model_creates_no_record() {
    let dir = TempDir::new().unwrap();
    opsgate(&dir)
        .args(["request", "deploy", "api"])
        .args(["--base-url", "http://127.0.0.1:1/api/generate", "--timeout", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("llm_call_failed"));

    opsgate(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No requests."));
}
