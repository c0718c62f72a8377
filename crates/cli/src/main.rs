//! HeyRAG CLI
//!
//! Main entry point for the `heyrag` command-line tool.
//! Asks questions against the local knowledge base, by text or by voice.

mod commands;
mod services;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ConversationsCommand, ModelsCommand, VoiceCommand};
use heyrag_core::{config::AppConfig, logging};
use std::path::PathBuf;

/// HeyRAG - retrieval-augmented answers from local models, spoken or typed
#[derive(Parser, Debug)]
#[command(name = "heyrag")]
#[command(about = "Retrieval-augmented answers from local models", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "HEYRAG_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "HEYRAG_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    /// Chat model identifier
    #[arg(short, long, global = true, env = "HEYRAG_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question against the knowledge base
    Ask(AskCommand),

    /// Answer spoken questions from audio files
    Voice(VoiceCommand),

    /// List installed chat models
    Models(ModelsCommand),

    /// List or show stored conversations
    Conversations(ConversationsCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(cli.workspace.clone(), cli.config.clone())?.with_overrides(
        cli.workspace,
        cli.config,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
        cli.json_logs,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color, config.json_logs)?;

    tracing::info!("HeyRAG CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Model: {}", config.ollama.model);

    config.validate()?;
    config.ensure_heyrag_dir()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Voice(_) => "voice",
        Commands::Models(_) => "models",
        Commands::Conversations(_) => "conversations",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await.map_err(anyhow::Error::from),
        Commands::Voice(cmd) => cmd.execute(&config).await,
        Commands::Models(cmd) => cmd.execute(&config).await.map_err(anyhow::Error::from),
        Commands::Conversations(cmd) => cmd.execute(&config).map_err(anyhow::Error::from),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {:#}", e),
    }

    result
}
