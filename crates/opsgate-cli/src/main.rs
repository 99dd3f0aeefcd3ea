mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, ModelArgs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "opsgate",
    about = "Turn natural-language ops requests into validated, approved, audited actions",
    version,
    propagate_version = true
)]
struct Cli {
    /// State directory (default: ~/.opsgate)
    #[arg(long, global = true, env = "OPSGATE_HOME")]
    home: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the model for a tool call and validate it; records nothing
    Parse {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Print the raw model output instead of the tool call
        #[arg(long)]
        raw: bool,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Submit a request; safe calls run immediately with --auto
    Request {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Execute without approval if the model marks the call safe
        #[arg(long)]
        auto: bool,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// List recorded requests
    List,

    /// Show one request
    Show { id: String },

    /// Approve and execute a pending request
    Approve { id: String },

    /// Show recent audit events
    Audit {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Inspect or change the model configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = opsgate_core::paths::resolve_home(cli.home.as_deref())
        .map_err(anyhow::Error::from)
        .and_then(|home| match cli.command {
            Commands::Parse { text, raw, model } => cmd::parse::run(&home, &text, raw, model, cli.json),
            Commands::Request { text, auto, model } => {
                cmd::request::submit(&home, &text, auto, model, cli.json)
            }
            Commands::List => cmd::request::list(&home, cli.json),
            Commands::Show { id } => cmd::request::show(&home, &id, cli.json),
            Commands::Approve { id } => cmd::request::approve(&home, &id, cli.json),
            Commands::Audit { limit } => cmd::audit::run(&home, limit, cli.json),
            Commands::Config { subcommand } => cmd::config::run(&home, subcommand, cli.json),
        });

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
