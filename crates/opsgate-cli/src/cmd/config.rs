use crate::output::{print_fields, print_json};
use anyhow::Context;
use clap::Subcommand;
use opsgate_core::config::{AiConfig, AiConfigUpdate};
use opsgate_core::paths;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the model configuration (api key masked)
    Show,

    /// Update fields of the model configuration
    Set {
        /// Provider: ollama, openai, or openai-compatible
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        model: Option<String>,
        /// Model call timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// API key; pass an empty string to clear it
        #[arg(long)]
        api_key: Option<String>,
        /// Execute requests the model marks safe without approval
        #[arg(long, value_name = "true|false")]
        auto_execute: Option<bool>,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(home: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(home, json),
        ConfigSubcommand::Set {
            provider,
            base_url,
            model,
            timeout,
            api_key,
            auto_execute,
        } => set(
            home,
            AiConfigUpdate {
                provider,
                base_url,
                model,
                timeout_s: timeout,
                api_key,
                auto_execute_safe: auto_execute,
            },
            json,
        ),
    }
}

fn show(home: &Path, json: bool) -> anyhow::Result<()> {
    let config = AiConfig::load(home).context("failed to load model config")?;
    print_config(&config.masked(), json)
}

fn set(home: &Path, update: AiConfigUpdate, json: bool) -> anyhow::Result<()> {
    let mut config = AiConfig::load(home).context("failed to load model config")?;
    config.apply(update)?;
    config.save(home).context("failed to save model config")?;
    tracing::info!(path = %paths::ai_config_path(home).display(), "model config updated");
    if !json {
        println!("Updated {}", paths::AI_CONFIG_FILE);
    }
    print_config(&config.masked(), json)
}

fn print_config(config: &AiConfig, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(config);
    }
    print_fields(&[
        ("provider", config.provider.clone()),
        ("base_url", config.base_url.clone()),
        ("model", config.model.clone()),
        ("timeout_s", config.timeout_s.to_string()),
        ("auto_execute_safe", config.auto_execute_safe.to_string()),
        (
            "api_key",
            config.api_key.clone().unwrap_or_else(|| "(not set)".to_string()),
        ),
    ]);
    Ok(())
}
