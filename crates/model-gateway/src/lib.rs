//! `model-gateway`: blocking transport to the language model that turns
//! operator text into tool calls.
//!
//! # Architecture
//!
//! ```text
//! GatewayRequest ── provider id ──▶ Provider (one impl per wire shape)
//!       │                               │ build_body / extract_text
//!       ▼                               ▼
//! HttpGateway  ── POST json ──▶  endpoint  ──▶ Completion { text, raw, latency }
//! ```
//!
//! Two wire shapes are supported:
//!
//! - single-prompt (`ollama`): `{model, prompt, stream: false}` → `response`
//! - chat (`openai`, `openai-compatible`): `{model, messages: [user]}` →
//!   `choices[0].message.content`
//!
//! Calls are never retried here. Any transport or decode failure is
//! reported as [`GatewayError::CallFailed`].

pub mod client;
pub mod error;
pub mod provider;

#[cfg(test)]
mod tests;

pub use client::{Completion, GatewayRequest, HttpGateway, ModelGateway};
pub use error::GatewayError;
pub use provider::{provider_for, ChatProvider, PromptProvider, Provider};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, GatewayError>;
