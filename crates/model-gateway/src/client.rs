use std::time::{Duration, Instant};

use serde_json::Value;

use crate::provider::provider_for;
use crate::{GatewayError, Result};

// ─── GatewayRequest ───────────────────────────────────────────────────────

/// Everything needed to reach one model endpoint for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRequest {
    /// Provider id: `ollama`, `openai`, or `openai-compatible`.
    pub provider: String,
    /// Full URL the request body is POSTed to.
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
    /// Sent as `Authorization: Bearer <key>` when present.
    pub api_key: Option<String>,
}

// ─── Completion ───────────────────────────────────────────────────────────

/// Result of a successful model call.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Extracted response text (possibly empty).
    pub text: String,
    /// Full decoded response payload.
    pub raw: Value,
    pub latency: Duration,
}

// ─── ModelGateway ─────────────────────────────────────────────────────────

/// Seam between the governance pipeline and the network.
pub trait ModelGateway {
    fn complete(&self, request: &GatewayRequest, prompt: &str) -> Result<Completion>;
}

/// Production gateway over a blocking `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpGateway;

impl HttpGateway {
    pub fn new() -> Self {
        Self
    }
}

impl ModelGateway for HttpGateway {
    fn complete(&self, request: &GatewayRequest, prompt: &str) -> Result<Completion> {
        let provider = provider_for(&request.provider)?;
        let body = provider.build_body(&request.model, prompt);

        let client = reqwest::blocking::Client::builder()
            .timeout(request.timeout)
            .build()?;

        let mut builder = client.post(&request.endpoint).json(&body);
        if let Some(key) = request.api_key.as_deref().filter(|k| !k.is_empty()) {
            builder = builder.bearer_auth(key);
        }

        tracing::debug!(
            provider = provider.id(),
            endpoint = %request.endpoint,
            model = %request.model,
            "calling model"
        );

        let start = Instant::now();
        let response = builder.send()?.error_for_status()?;
        let payload = response.text()?;
        let latency = start.elapsed();

        let raw: Value = serde_json::from_str(&payload)
            .map_err(|e| GatewayError::CallFailed(format!("invalid response body: {e}")))?;
        let text = provider.extract_text(&raw);

        tracing::debug!(
            provider = provider.id(),
            latency_ms = latency.as_millis() as u64,
            chars = text.len(),
            "model responded"
        );

        Ok(Completion { text, raw, latency })
    }
}
