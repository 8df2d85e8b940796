//! uds-echo CLI
//!
//! - `serve`: echo server that broadcasts every message back to all peers
//! - `connect`: line-based client
//! - `config`: inspect or create the config file

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use uds_echo::commands;

#[derive(Parser)]
#[command(name = "uds-echo")]
#[command(author, version, about = "Echo server and client over Unix domain sockets")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Socket path (overrides config)
    #[arg(short, long, global = true, env = "UDS_ECHO_SOCKET")]
    socket: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(short, long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the echo server
    Serve {
        /// Maximum concurrent peers, 0 for unlimited (overrides config)
        #[arg(short, long)]
        max_connections: Option<usize>,
    },

    /// Connect to a server and send stdin lines
    Connect,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show effective configuration
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| cli.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config_path = cli.config.as_ref();

    match cli.command {
        Commands::Serve { max_connections } => {
            let mut settings = commands::load_settings(config_path, cli.socket.as_deref())?;
            if let Some(max) = max_connections {
                settings.server.max_connections = max;
            }
            commands::serve_command(settings.server, commands::shutdown_signal()).await
        }
        Commands::Connect => {
            let settings = commands::load_settings(config_path, cli.socket.as_deref())?;
            commands::connect_command(settings.client, commands::shutdown_signal()).await
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let settings = commands::load_settings(config_path, cli.socket.as_deref())?;
                commands::config_show(config_path, &settings)
            }
            ConfigAction::Init { force } => commands::config_init(config_path, force),
            ConfigAction::Path => commands::config_path(config_path),
        },
    }
}
