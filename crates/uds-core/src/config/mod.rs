//! Configuration management for uds

mod client;
pub mod serde_utils;
mod server;

pub use client::ClientConfig;
pub use server::ServerConfig;

use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default socket path shared by the server and client configs
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/uds-echo.sock";

/// Default capacity of the inbound message channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 2048;

/// Full configuration file with one section per role
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Server settings
    pub server: ServerConfig,
    /// Client settings
    pub client: ClientConfig,
}

impl ConfigFile {
    /// Check both sections
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.client.validate()
    }
}

/// Per-user config directory (`<config dir>/uds`)
pub fn default_config_dir() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join("uds"),
        None => PathBuf::from(".uds"),
    }
}

/// `config.toml` inside [`default_config_dir`]
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Read and parse a TOML config file
///
/// Missing keys take their defaults; a missing file is `ConfigError::NotFound`.
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ConfigError::NotFound(path.to_path_buf()))
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let config = toml::from_str(&content)?;
    tracing::debug!("Loaded config from {:?}", path);
    Ok(config)
}

/// Write a config as TOML, creating parent directories as needed
pub fn save_config<T: Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let rendered = toml::to_string_pretty(config)?;
    let io_error = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(io_error)?;
    }
    std::fs::write(path, rendered).map_err(io_error)
}
