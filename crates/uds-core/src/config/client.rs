//! Client configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_SOCKET_PATH};
use crate::error::ConfigError;
use uds_protocol::DEFAULT_MAX_FRAME_LENGTH;

/// Configuration for a socket client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server socket to dial
    pub socket_path: PathBuf,

    /// Capacity of the inbound message channel
    pub channel_capacity: usize,

    /// Largest accepted message payload in bytes
    pub max_frame_length: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}

impl ClientConfig {
    /// Reject values the client cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "client channel_capacity must be at least 1".into(),
            ));
        }
        if self.max_frame_length == 0 {
            return Err(ConfigError::Invalid(
                "client max_frame_length must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
