//! Björnify - chat-style Spotify control with a Sonos fallback.
//!
//! Each subcommand runs one chat command and prints the reply; `repl` reads
//! chat lines from stdin until EOF or Ctrl+C, which is how the bot is wired
//! to a chat bridge.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bjornify_core::{
    bootstrap_services, ChatCommand, CommandHandler, CredentialStore, FileCredentialStore,
};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;

use crate::config::BotConfig;

/// Björnify - queue and control Spotify playback, falling back to Sonos.
#[derive(Parser, Debug)]
#[command(name = "bjornify")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE", env = "BJORNIFY_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "BJORNIFY_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// spotipy token cache (overrides config file).
    #[arg(short = 't', long, value_name = "FILE")]
    token_cache: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pause playback.
    Pause,
    /// Skip to the next track.
    Next,
    /// Queue a track by search query, Spotify URI or share link.
    Add {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Show what is playing.
    Np,
    /// List the top search results.
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Read chat lines from stdin and print replies.
    Repl,
}

impl Command {
    /// The chat command a one-shot subcommand stands for.
    fn chat_command(&self) -> Option<ChatCommand> {
        match self {
            Self::Pause => Some(ChatCommand::Pause),
            Self::Next => Some(ChatCommand::Next),
            Self::Add { query } => Some(ChatCommand::Add(query.join(" "))),
            Self::Np => Some(ChatCommand::NowPlaying),
            Self::Search { query } => Some(ChatCommand::Search(query.join(" "))),
            Self::Repl => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Björnify version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        BotConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(token_cache) = args.token_cache {
        config.token_cache = token_cache;
    }

    let client_credentials = config.client_credentials()?;

    let store = Arc::new(FileCredentialStore::new(&config.token_cache));
    let initial = store.load().with_context(|| {
        format!(
            "Failed to read token cache {}. Run the spotipy authorization flow once to create it.",
            config.token_cache.display()
        )
    })?;

    log::info!(
        "Configuration: token_cache={}, preferred_device={}",
        config.token_cache.display(),
        config.preferred_device
    );

    let services = bootstrap_services(
        &config.to_core_config(),
        client_credentials,
        initial,
        Some(store as Arc<dyn CredentialStore>),
    )
    .context("Failed to bootstrap services")?;

    match args.command.chat_command() {
        Some(command) => {
            let reply = services.commands.handle(command).await;
            println!("{}", reply);
        }
        None => run_repl(&services.commands).await?,
    }

    Ok(())
}

/// Answers chat lines from stdin until EOF or a shutdown signal.
async fn run_repl(commands: &CommandHandler) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    log::info!("Reading commands from stdin");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = &mut shutdown => {
                log::info!("Shutdown signal received");
                break;
            }
        };

        let Some(line) = line else {
            log::info!("stdin closed");
            break;
        };

        if let Some(reply) = commands.handle_line(&line).await {
            println!("{}", reply);
        }
    }

    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
