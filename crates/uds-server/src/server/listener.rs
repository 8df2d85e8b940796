//! Socket server listener
//!
//! Owns the accept task and the unified shutdown sequence. Whether the
//! server stops because `shutdown` was called or because `accept` failed,
//! the same steps run in the same order: stop accepting, drop the listener,
//! signal and close every pooled connection, wait for all handlers, then let
//! the inbound stream close and remove the socket file.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use futures::future::join_all;
use tokio::net::UnixListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use uds_core::config::ServerConfig;
use uds_core::{
    message_channel, Connection, ConnectionError, DeliveryError, LinkState, MessageSender,
    MessageStream, PeerIdentity, UdsError,
};
use uds_protocol::append_delimiter_if_absent;

use crate::server::handler::handle_connection;
use crate::state::ServerState;

type AcceptTask = JoinHandle<Result<(), ConnectionError>>;

/// Server that listens on a filesystem socket path
pub struct SocketServer {
    /// Shared server state
    state: Arc<ServerState>,
    /// Cancelled to begin shutdown; each connection gets a child token
    cancel: CancellationToken,
    /// Accept task, taken by whoever joins it first
    accept_task: Mutex<Option<AcceptTask>>,
}

impl SocketServer {
    /// Create a new server (does not bind yet)
    pub fn new(config: ServerConfig) -> Self {
        Self {
            state: Arc::new(ServerState::new(config)),
            cancel: CancellationToken::new(),
            accept_task: Mutex::new(None),
        }
    }

    /// Create a server with default settings on the given path
    pub fn with_socket_path(socket_path: impl Into<PathBuf>) -> Self {
        Self::new(ServerConfig::with_socket_path(socket_path))
    }

    /// Path the server binds to
    pub fn socket_path(&self) -> &Path {
        &self.state.config.socket_path
    }

    /// Current lifecycle state
    pub fn state(&self) -> LinkState {
        self.state.link_state()
    }

    /// Whether shutdown has started or finished
    pub fn is_interrupted(&self) -> bool {
        matches!(self.state(), LinkState::Closing | LinkState::Closed)
    }

    /// Error that stopped the accept loop, if any
    pub fn listener_error(&self) -> Option<Arc<io::Error>> {
        self.state.listener_error()
    }

    /// Most recent per-connection failure
    pub fn client_error(&self) -> Option<Arc<UdsError>> {
        self.state.client_error()
    }

    /// Number of pooled connections
    pub fn connection_count(&self) -> usize {
        self.state.connections.len()
    }

    /// Identities of pooled connections
    pub fn peers(&self) -> Vec<PeerIdentity> {
        self.state.connections.identities()
    }

    /// Bind the socket and start accepting peers
    ///
    /// Returns the stream every peer's messages are delivered to. The stream
    /// ends after shutdown once all connection handlers have exited. A server
    /// can only be started once.
    pub async fn listen_and_receive(&self) -> Result<MessageStream, ConnectionError> {
        self.state.config.validate()?;

        if !self
            .state
            .link()
            .transition(LinkState::Idle, LinkState::Open)
        {
            return Err(ConnectionError::AlreadyStarted);
        }

        let path = self.socket_path().to_path_buf();
        remove_stale_socket(&path).await;

        let listener = match UnixListener::bind(&path) {
            Ok(listener) => listener,
            Err(source) => {
                tracing::error!("Failed to bind {:?}: {}", path, source);
                self.state
                    .record_listener_error(io::Error::new(source.kind(), source.to_string()));
                self.state.link().set(LinkState::Closed);
                return Err(ConnectionError::Bind { path, source });
            }
        };

        tracing::info!("Socket server listening on {:?}", path);

        let (tx, stream) = message_channel(self.state.config.channel_capacity);
        let task = tokio::spawn(run_accept_loop(
            listener,
            Arc::clone(&self.state),
            tx,
            self.cancel.clone(),
        ));
        *self
            .accept_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(task);

        Ok(stream)
    }

    /// Write a message to every pooled connection
    ///
    /// Writes run concurrently against a snapshot of the pool. A failing
    /// peer does not stop delivery to the others; every failure is
    /// returned, so an empty vec means every peer got the message.
    pub async fn send_all(&self, message: impl Into<Bytes>) -> Vec<DeliveryError> {
        let message = append_delimiter_if_absent(message.into());
        let peers = self.state.connections.snapshot();

        let writes = peers.iter().map(|conn| {
            let message = message.clone();
            async move {
                conn.send(message).await.map_err(|source| DeliveryError {
                    peer: conn.identity().clone(),
                    source,
                })
            }
        });

        let errors: Vec<DeliveryError> = join_all(writes)
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect();

        for e in &errors {
            tracing::warn!("Broadcast: {}", e);
        }
        tracing::debug!(
            peers = peers.len(),
            failed = errors.len(),
            "Broadcast {} bytes",
            message.len()
        );

        errors
    }

    /// Write a message to one pooled connection
    pub async fn send_to(
        &self,
        peer: &PeerIdentity,
        message: impl Into<Bytes>,
    ) -> Result<(), UdsError> {
        let conn = self.state.connections.get(peer)?;
        conn.send(message.into()).await?;
        Ok(())
    }

    /// Stop the server and wait until every connection handler has exited
    ///
    /// Safe to call more than once and after the accept loop already failed
    /// on its own; later calls return `Ok(())`.
    pub async fn shutdown(&self) -> Result<(), ConnectionError> {
        if self.state() == LinkState::Idle {
            return Err(ConnectionError::NotListening);
        }

        self.state
            .link()
            .transition(LinkState::Open, LinkState::Closing);
        self.cancel.cancel();

        let task = self
            .accept_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match task {
            Some(task) => task
                .await
                .map_err(|e| ConnectionError::Task(e.to_string()))?,
            None => Ok(()),
        }
    }
}

impl Drop for SocketServer {
    fn drop(&mut self) {
        // Handlers exit on their own once signalled
        self.cancel.cancel();
    }
}

/// Remove a leftover socket file from a previous run
async fn remove_stale_socket(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!("Removed stale socket file {:?}", path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove stale socket file {:?}: {}", path, e),
    }
}

async fn run_accept_loop(
    listener: UnixListener,
    state: Arc<ServerState>,
    tx: MessageSender,
    cancel: CancellationToken,
) -> Result<(), ConnectionError> {
    let handlers = TaskTracker::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Socket server shutting down");
                break;
            }

            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        let identity =
                            PeerIdentity::for_accepted(state.next_sequence(), addr.as_pathname());
                        tracing::debug!(peer = %identity, "Accepted connection");
                        handlers.spawn(handle_connection(
                            stream,
                            identity,
                            Arc::clone(&state),
                            tx.clone(),
                            cancel.child_token(),
                        ));
                    }
                    Err(e) => {
                        tracing::error!("Failed to accept connection: {}", e);
                        state.record_listener_error(e);
                        break;
                    }
                }
            }
        }
    }

    drain(listener, &state, tx, &cancel, handlers).await
}

/// Shutdown sequence shared by explicit shutdown and listener failure
async fn drain(
    listener: UnixListener,
    state: &ServerState,
    tx: MessageSender,
    cancel: &CancellationToken,
    handlers: TaskTracker,
) -> Result<(), ConnectionError> {
    state.link().transition(LinkState::Open, LinkState::Closing);
    drop(listener);

    // Child tokens stop every read loop
    cancel.cancel();

    // The stream closes once the last handler drops its sender
    drop(tx);
    handlers.close();

    // Closing the write halves lets each peer see EOF even if its handler is
    // still busy. The tokens are already cancelled, so no close waits on a
    // peer that stopped reading.
    let close_and_wait = async {
        for conn in state.connections.drain() {
            if let Err(e) = conn.close().await {
                tracing::debug!(peer = %conn.identity(), "Error closing connection: {}", e);
            }
        }
        handlers.wait().await;
    };

    let timeout = state.config.shutdown_timeout;
    let drained = tokio::time::timeout(timeout, close_and_wait).await;

    remove_stale_socket(&state.config.socket_path).await;
    state.link().set(LinkState::Closed);

    match drained {
        Ok(()) => {
            tracing::info!("Socket server stopped");
            Ok(())
        }
        Err(_) => {
            tracing::warn!(
                "{} connection handlers still running after {:?}",
                handlers.len(),
                timeout
            );
            Err(ConnectionError::ShutdownTimeout(timeout))
        }
    }
}
