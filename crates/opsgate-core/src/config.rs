use crate::error::{OpsgateError, Result};
use crate::paths;
use model_gateway::GatewayRequest;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const MASKED: &str = "***";

pub const ENV_PROVIDER: &str = "OPSGATE_LLM_PROVIDER";
pub const ENV_BASE_URL: &str = "OPSGATE_LLM_BASE_URL";
pub const ENV_MODEL: &str = "OPSGATE_LLM_MODEL";
pub const ENV_TIMEOUT: &str = "OPSGATE_LLM_TIMEOUT";
pub const ENV_API_KEY: &str = "OPSGATE_LLM_API_KEY";

// ---------------------------------------------------------------------------
// AiConfig
// ---------------------------------------------------------------------------

/// Contents of `config/ai.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub timeout_s: u64,
    /// Standing policy: execute requests the model marks as safe without
    /// an approval step.
    pub auto_execute_safe: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434/api/generate".to_string(),
            model: "qwen3-coder".to_string(),
            timeout_s: 60,
            auto_execute_safe: false,
            api_key: None,
        }
    }
}

impl AiConfig {
    /// Missing file yields defaults; a malformed file is an error.
    pub fn load(home: &Path) -> Result<Self> {
        let path = paths::ai_config_path(home);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&data)?)
    }

    pub fn save(&self, home: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&paths::ai_config_path(home), data.as_bytes())
    }

    /// Copy safe to print: the api key, if any, is replaced by `***`.
    pub fn masked(&self) -> Self {
        Self {
            api_key: self.api_key.as_ref().map(|_| MASKED.to_string()),
            ..self.clone()
        }
    }

    pub fn apply(&mut self, update: AiConfigUpdate) -> Result<()> {
        if let Some(provider) = update.provider {
            model_gateway::provider_for(&provider).map_err(|e| OpsgateError::InvalidConfig {
                key: "provider".to_string(),
                reason: e.to_string(),
            })?;
            self.provider = provider;
        }
        if let Some(base_url) = update.base_url {
            if base_url.trim().is_empty() {
                return Err(invalid("base_url", "must not be empty"));
            }
            self.base_url = base_url;
        }
        if let Some(model) = update.model {
            if model.trim().is_empty() {
                return Err(invalid("model", "must not be empty"));
            }
            self.model = model;
        }
        if let Some(timeout_s) = update.timeout_s {
            if timeout_s == 0 {
                return Err(invalid("timeout_s", "must be at least 1"));
            }
            self.timeout_s = timeout_s;
        }
        if let Some(key) = update.api_key {
            self.api_key = Some(key).filter(|k| !k.is_empty());
        }
        if let Some(auto) = update.auto_execute_safe {
            self.auto_execute_safe = auto;
        }
        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> OpsgateError {
    OpsgateError::InvalidConfig {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Partial update for `config set`. An empty `api_key` clears the key.
#[derive(Debug, Clone, Default)]
pub struct AiConfigUpdate {
    pub provider: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout_s: Option<u64>,
    pub api_key: Option<String>,
    pub auto_execute_safe: Option<bool>,
}

// ---------------------------------------------------------------------------
// LlmSettings
// ---------------------------------------------------------------------------

/// Per-call overrides; each set field beats env and file.
#[derive(Debug, Clone, Default)]
pub struct LlmOverrides {
    pub provider: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout_s: Option<u64>,
    pub api_key: Option<String>,
}

/// Effective model settings for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub api_key: Option<String>,
}

impl LlmSettings {
    pub fn resolve(config: &AiConfig, overrides: &LlmOverrides) -> Self {
        Self::resolve_with_env(config, overrides, |k| std::env::var(k).ok())
    }

    /// Field-wise: override, then environment, then file (which already
    /// carries defaults for absent keys).
    pub fn resolve_with_env<F>(config: &AiConfig, overrides: &LlmOverrides, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.is_empty());

        let env_timeout = env(ENV_TIMEOUT).and_then(|v| match v.trim().parse::<u64>() {
            Ok(n) if n > 0 => Some(n),
            _ => {
                tracing::warn!(value = %v, "ignoring unparsable {ENV_TIMEOUT}");
                None
            }
        });

        Self {
            provider: overrides
                .provider
                .clone()
                .or_else(|| env(ENV_PROVIDER))
                .unwrap_or_else(|| config.provider.clone()),
            base_url: overrides
                .base_url
                .clone()
                .or_else(|| env(ENV_BASE_URL))
                .unwrap_or_else(|| config.base_url.clone()),
            model: overrides
                .model
                .clone()
                .or_else(|| env(ENV_MODEL))
                .unwrap_or_else(|| config.model.clone()),
            timeout: Duration::from_secs(
                overrides.timeout_s.or(env_timeout).unwrap_or(config.timeout_s),
            ),
            api_key: overrides
                .api_key
                .clone()
                .or_else(|| env(ENV_API_KEY))
                .or_else(|| config.api_key.clone())
                .filter(|k| !k.is_empty()),
        }
    }

    pub fn to_gateway_request(&self) -> GatewayRequest {
        GatewayRequest {
            provider: self.provider.clone(),
            endpoint: self.base_url.clone(),
            model: self.model.clone(),
            timeout: self.timeout,
            api_key: self.api_key.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
