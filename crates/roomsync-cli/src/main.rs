//! roomsync CLI
//!
//! Command-line interface for roomsync - realtime chat rooms.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use roomsync_core::Config;

mod commands;
mod output;

use commands::chat::ChatOptions;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "roomsync")]
#[command(about = "roomsync - realtime chat rooms")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a local chat session
    Chat {
        /// Email to sign up with
        #[arg(short, long)]
        email: String,
        /// Password to sign up with
        #[arg(short, long, default_value = "password")]
        password: String,
        /// Room to join instead of the configured default
        #[arg(short, long)]
        room: Option<String>,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Post a new-user announcement to the notification channel
    NotifySignup {
        /// User id of the new account
        #[arg(long)]
        uid: String,
        /// Email of the new account
        #[arg(long)]
        email: Option<String>,
        /// Display name of the new account
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (default_room, message_limit, notify.endpoint, notify.channel, notify.token)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    init_logging();

    let config_path = cli.config.unwrap_or_else(Config::config_file_path);

    match cli.command {
        Commands::Config { command } => match command {
            Some(ConfigCommands::Show) | None => commands::config::show(&config_path, &output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key, value, &config_path, &output)
            }
        },
        Commands::Chat {
            email,
            password,
            room,
        } => {
            let config = load_config(&config_path)?;
            let options = ChatOptions {
                email,
                password,
                room,
            };
            commands::chat::run(&config, options, &output).await
        }
        Commands::NotifySignup { uid, email, name } => {
            let config = load_config(&config_path)?;
            commands::notify::signup(&config, uid, email, name, &output).await
        }
    }
}

fn load_config(path: &PathBuf) -> Result<Config> {
    Config::load_from_path(path).context("Failed to load configuration")
}

/// Initialize logging to stderr
///
/// Level comes from ROOMSYNC_LOG (default: warn).
fn init_logging() {
    let log_level = std::env::var("ROOMSYNC_LOG").unwrap_or_else(|_| "warn".to_string());
    let env_filter = EnvFilter::new(format!(
        "roomsync_core={},roomsync_cli={}",
        log_level, log_level
    ));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
