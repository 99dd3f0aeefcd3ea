pub mod audit;
pub mod config;
pub mod parse;
pub mod request;

use clap::Args;
use opsgate_core::config::LlmOverrides;

/// Per-call model settings; each beats env and `config/ai.yaml`.
#[derive(Args, Debug)]
pub struct ModelArgs {
    /// Provider: ollama, openai, or openai-compatible
    #[arg(long)]
    pub provider: Option<String>,

    /// Endpoint URL the request is POSTed to
    #[arg(long)]
    pub base_url: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    /// Model call timeout in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    #[arg(long)]
    pub api_key: Option<String>,
}

impl From<ModelArgs> for LlmOverrides {
    fn from(args: ModelArgs) -> Self {
        LlmOverrides {
            provider: args.provider,
            base_url: args.base_url,
            model: args.model,
            timeout_s: args.timeout,
            api_key: args.api_key,
        }
    }
}

/// Join positional words into the request text.
pub fn request_text(words: &[String]) -> anyhow::Result<String> {
    let text = words.join(" ").trim().to_string();
    if text.is_empty() {
        anyhow::bail!("request text is empty");
    }
    Ok(text)
}
