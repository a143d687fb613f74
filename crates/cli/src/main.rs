//! TutorBridge CLI, the main entry point.
//!
//! Commands:
//! - `serve`   Start the HTTP webhook server
//! - `ask`     Answer one message in-process, without HTTP
//! - `config`  Show or validate the effective configuration

use clap::{Parser, Subcommand};
use tutorbridge_config::{AppConfig, ConfigError};

mod commands;

#[derive(Parser)]
#[command(
    name = "tutorbridge",
    about = "TutorBridge, a Gemini-backed study assistant webhook",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP webhook server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send a single message through the pipeline and print the reply
    Ask {
        /// The message to answer
        #[arg(short, long)]
        message: String,

        /// Prior conversation as a JSON array of {role, content}
        #[arg(short, long)]
        context: Option<String>,

        /// Print the full response body as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML (API key redacted)
    Show {
        /// Print built-in defaults instead of the effective configuration
        #[arg(long)]
        defaults: bool,
    },

    /// Load and validate the configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load config before logging so `DEBUG` can raise the level.
    let (config, sources) = AppConfig::load();
    let debug = cli.verbose || config.as_ref().is_ok_and(|c| c.debug);
    init_tracing(debug, cli.json_logs);
    sources.log();
    tracing::debug!(config = ?config, "Configuration loaded");

    match cli.command {
        Commands::Serve { port } => commands::serve::run(loaded(config)?, port).await?,
        Commands::Ask {
            message,
            context,
            json,
        } => commands::ask::run(loaded(config)?, &message, context.as_deref(), json).await?,
        Commands::Config {
            action: ConfigAction::Show { defaults },
        } => commands::config_cmd::show(&loaded(config)?, defaults)?,
        Commands::Config {
            action: ConfigAction::Validate,
        } => commands::config_cmd::validate(config)?,
    }

    Ok(())
}

fn loaded(config: Result<AppConfig, ConfigError>) -> Result<AppConfig, String> {
    config.map_err(|e| format!("Failed to load config: {e}"))
}

fn init_tracing(debug: bool, json: bool) {
    let filter = if debug { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_current_span(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }
}
