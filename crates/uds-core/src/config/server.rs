//! Server configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::serde_utils::duration_secs;
use super::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_SOCKET_PATH};
use crate::error::ConfigError;
use uds_protocol::DEFAULT_MAX_FRAME_LENGTH;

/// Configuration for a socket server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Filesystem path the listener binds to
    pub socket_path: PathBuf,

    /// Maximum number of concurrent peers (0 = unlimited)
    pub max_connections: usize,

    /// Capacity of the shared inbound message channel
    pub channel_capacity: usize,

    /// Largest accepted message payload in bytes
    pub max_frame_length: usize,

    /// How long shutdown waits for connection handlers to finish
    #[serde(with = "duration_secs")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            max_connections: 10,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    /// Default config bound to a specific path
    pub fn with_socket_path(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            ..Self::default()
        }
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.socket_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("server socket_path is empty".into()));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "server channel_capacity must be at least 1".into(),
            ));
        }
        if self.max_frame_length == 0 {
            return Err(ConfigError::Invalid(
                "server max_frame_length must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.channel_capacity, 2048);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
        config.validate().unwrap();
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = ServerConfig {
            channel_capacity: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_shutdown_timeout_in_seconds() {
        let config: ServerConfig = toml::from_str("shutdown_timeout = 12").unwrap();
        assert_eq!(config.shutdown_timeout, Duration::from_secs(12));
    }
}
