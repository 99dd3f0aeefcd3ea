use crate::error::{OpsgateError, Result};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const HOME_DIR: &str = ".opsgate";
pub const REQUESTS_DIR: &str = "requests";
pub const SCRIPTS_DIR: &str = "scripts";

pub const AI_CONFIG_FILE: &str = "config/ai.yaml";
pub const PIPELINES_FILE: &str = "config/pipeline.json";
pub const AUDIT_FILE: &str = "audit/ai_audit.jsonl";

pub const DEPLOY_SCRIPT: &str = "deploy.sh";
pub const ROLLBACK_SCRIPT: &str = "rollback.sh";

pub const HOME_ENV: &str = "OPSGATE_HOME";
pub const SCRIPTS_ENV: &str = "OPSGATE_SCRIPTS_DIR";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// Resolve the opsgate home: explicit path, then `OPSGATE_HOME`, then
/// `~/.opsgate`.
pub fn resolve_home(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = explicit {
        return Ok(p.to_path_buf());
    }
    if let Some(p) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(p));
    }
    let home = home::home_dir().ok_or(OpsgateError::HomeNotFound)?;
    Ok(home.join(HOME_DIR))
}

pub fn ai_config_path(home: &Path) -> PathBuf {
    home.join(AI_CONFIG_FILE)
}

pub fn pipelines_path(home: &Path) -> PathBuf {
    home.join(PIPELINES_FILE)
}

pub fn requests_dir(home: &Path) -> PathBuf {
    home.join(REQUESTS_DIR)
}

pub fn request_path(home: &Path, id: &str) -> PathBuf {
    requests_dir(home).join(format!("{id}.yaml"))
}

pub fn request_lock_path(home: &Path, id: &str) -> PathBuf {
    requests_dir(home).join(format!("{id}.lock"))
}

pub fn audit_path(home: &Path) -> PathBuf {
    home.join(AUDIT_FILE)
}

/// Scripts directory: `OPSGATE_SCRIPTS_DIR` if set, else `<home>/scripts`.
pub fn scripts_dir(home: &Path) -> PathBuf {
    match std::env::var_os(SCRIPTS_ENV).filter(|v| !v.is_empty()) {
        Some(p) => PathBuf::from(p),
        None => home.join(SCRIPTS_DIR),
    }
}

/// Request ids are `ai-` followed by lowercase hex. Anything else (path
/// separators in particular) never reaches the filesystem.
pub fn is_valid_request_id(id: &str) -> bool {
    match id.strip_prefix("ai-") {
        Some(rest) => {
            !rest.is_empty()
                && rest.len() <= 32
                && rest.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        }
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
