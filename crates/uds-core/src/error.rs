//! Core error types for uds

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use uds_protocol::ProtocolError;

use crate::types::PeerIdentity;

/// Top-level error type for the uds crates
#[derive(Error, Debug)]
pub enum UdsError {
    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Pool error
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Connection pool errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Pool is bounded and already full
    #[error("Pool capacity exceeded (max {max} connections)")]
    CapacityExceeded { max: usize },

    /// A connection with the same identity is already registered
    #[error("Connection already registered: {0}")]
    DuplicateIdentity(PeerIdentity),

    /// No connection with this identity
    #[error("Connection not found: {0}")]
    NotFound(PeerIdentity),
}

/// Connection lifecycle errors
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Operation requires an open connection
    #[error("Not connected")]
    NotConnected,

    /// Client already holds an open connection
    #[error("Already connected")]
    AlreadyConnected,

    /// Server has not been started
    #[error("Server is not listening")]
    NotListening,

    /// Server was already started once
    #[error("Server already started")]
    AlreadyStarted,

    /// Binding the listening socket failed
    #[error("Failed to bind {path:?}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Dialing the server socket failed
    #[error("Failed to connect to {path:?}: {source}")]
    Dial {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Connection handlers did not finish in time
    #[error("Shutdown timed out after {0:?}")]
    ShutdownTimeout(Duration),

    /// Background task failed to complete
    #[error("Background task failed: {0}")]
    Task(String),

    /// Configuration rejected before starting
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Framing error
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// A failed write to one peer during a broadcast
#[derive(Error, Debug)]
#[error("Delivery to {peer} failed: {source}")]
pub struct DeliveryError {
    /// Peer the message was meant for
    pub peer: PeerIdentity,
    /// Underlying write error
    #[source]
    pub source: ProtocolError,
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Reading or writing the config file failed
    #[error("Config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_error_display() {
        let err = PoolError::CapacityExceeded { max: 10 };
        assert_eq!(err.to_string(), "Pool capacity exceeded (max 10 connections)");

        let err = PoolError::NotFound(PeerIdentity::new("peer-7"));
        assert_eq!(err.to_string(), "Connection not found: peer-7");
    }

    #[test]
    fn test_delivery_error_keeps_source() {
        let err = DeliveryError {
            peer: PeerIdentity::new("peer-1"),
            source: ProtocolError::Io(std::io::ErrorKind::BrokenPipe.into()),
        };
        assert!(err.to_string().starts_with("Delivery to peer-1 failed"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
