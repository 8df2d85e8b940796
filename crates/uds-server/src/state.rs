//! Shared server state

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use uds_core::config::ServerConfig;
use uds_core::{LinkState, StateCell, UdsError};

use crate::connection::{ConnectionPool, PeerConnection};

/// State shared between the server handle, its accept task and every
/// connection handler
pub struct ServerState {
    /// Configuration
    pub config: ServerConfig,
    /// Connection pool
    pub connections: ConnectionPool<PeerConnection>,
    /// Listener lifecycle
    link: StateCell,
    /// Error that stopped the accept loop, if any
    listener_error: Mutex<Option<Arc<io::Error>>>,
    /// Most recent per-connection failure
    client_error: Mutex<Option<Arc<UdsError>>>,
    /// Source of accept sequence numbers
    next_sequence: AtomicU64,
}

impl ServerState {
    /// Create new server state
    pub fn new(config: ServerConfig) -> Self {
        let connections = ConnectionPool::new(config.max_connections);
        Self {
            config,
            connections,
            link: StateCell::new(),
            listener_error: Mutex::new(None),
            client_error: Mutex::new(None),
            next_sequence: AtomicU64::new(1),
        }
    }

    /// Listener lifecycle cell
    pub fn link(&self) -> &StateCell {
        &self.link
    }

    /// Current lifecycle state
    pub fn link_state(&self) -> LinkState {
        self.link.get()
    }

    /// Next accept sequence number, starting at 1
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// Error that stopped the accept loop, if any
    pub fn listener_error(&self) -> Option<Arc<io::Error>> {
        self.listener_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record the error that stopped the accept loop
    pub fn record_listener_error(&self, error: io::Error) {
        *self
            .listener_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(error));
    }

    /// Most recent per-connection failure
    pub fn client_error(&self) -> Option<Arc<UdsError>> {
        self.client_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record a per-connection failure
    pub fn record_client_error(&self, error: impl Into<UdsError>) {
        *self
            .client_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(error.into()));
    }
}
