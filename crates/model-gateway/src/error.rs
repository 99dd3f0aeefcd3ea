use thiserror::Error;

/// Transport-level failures. The Display form is the stable reason code
/// callers persist and print.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("unsupported_provider:{0}")]
    UnsupportedProvider(String),

    #[error("llm_call_failed:{0}")]
    CallFailed(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::CallFailed(e.to_string())
    }
}
