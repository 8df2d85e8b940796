//! CLI command implementations

mod config;
mod connect;
mod serve;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use uds_core::config::{self as core_config, ConfigFile};

pub use config::{config_init, config_path, config_show};
pub use connect::connect_command;
pub use serve::{is_exit_command, serve_command, EXIT_COMMAND};

/// Resolve which config file applies
///
/// An explicit path wins; otherwise the per-user default location.
pub fn resolve_config_path(config_path: Option<&PathBuf>) -> PathBuf {
    config_path
        .cloned()
        .unwrap_or_else(core_config::default_config_path)
}

/// Load settings for a command
///
/// A config file given on the command line must exist. The default file is
/// optional and built-in defaults apply without it. `socket` overrides the
/// socket path of both sections.
pub fn load_settings(config_path: Option<&PathBuf>, socket: Option<&Path>) -> Result<ConfigFile> {
    let path = resolve_config_path(config_path);

    let mut settings = if config_path.is_some() || path.exists() {
        core_config::load_config::<ConfigFile>(&path)
            .with_context(|| format!("Failed to load config file: {:?}", path))?
    } else {
        tracing::debug!("No config file at {:?}, using defaults", path);
        ConfigFile::default()
    };

    if let Some(socket) = socket {
        settings.server.socket_path = socket.to_path_buf();
        settings.client.socket_path = socket.to_path_buf();
    }

    settings.validate().context("Invalid configuration")?;
    Ok(settings)
}

/// Token cancelled on Ctrl+C or SIGTERM
pub fn shutdown_signal() -> CancellationToken {
    let cancel = CancellationToken::new();

    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            result = ctrl_c => {
                if let Err(e) = result {
                    tracing::warn!("Failed to listen for Ctrl+C: {}", e);
                    return;
                }
                tracing::info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating shutdown...");
            }
        }

        cancel_clone.cancel();
    });

    cancel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_explicit_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");

        assert!(load_settings(Some(&missing), None).is_err());
    }

    #[test]
    fn test_socket_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        core_config::save_config(&path, &ConfigFile::default()).unwrap();

        let socket = dir.path().join("override.sock");
        let settings = load_settings(Some(&path), Some(&socket)).unwrap();

        assert_eq!(settings.server.socket_path, socket);
        assert_eq!(settings.client.socket_path, socket);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nchannel_capacity = 0\n").unwrap();

        let err = load_settings(Some(&path), None).unwrap_err();
        assert!(format!("{:#}", err).contains("channel_capacity"));
    }
}
