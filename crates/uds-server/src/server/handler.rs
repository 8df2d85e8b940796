//! Per-connection handler
//!
//! Registers the peer, reads frames until the peer goes away or the server
//! shuts down, and pushes each frame into the shared inbound channel.

use std::sync::Arc;

use futures::StreamExt;
use tokio::net::unix::OwnedReadHalf;
use tokio::net::UnixStream;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;

use uds_core::{Connection, MessageSender, PeerIdentity, PoolError};
use uds_protocol::{LineCodec, ProtocolError};

use crate::connection::PeerConnection;
use crate::state::ServerState;

/// Why a read loop ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadExit {
    /// Peer closed its end
    Eof,
    /// Server shutdown or explicit close
    Cancelled,
    /// Consumer dropped the inbound stream
    StreamClosed,
}

/// Drive one accepted connection to completion
pub(crate) async fn handle_connection(
    stream: UnixStream,
    identity: PeerIdentity,
    state: Arc<ServerState>,
    tx: MessageSender,
    cancel: CancellationToken,
) {
    let codec = LineCodec::with_max_frame_length(state.config.max_frame_length);
    let (read_half, write_half) = stream.into_split();
    let conn = Arc::new(PeerConnection::new(
        identity.clone(),
        write_half,
        codec.clone(),
        cancel.clone(),
    ));

    if let Err(e) = state.connections.add(Arc::clone(&conn)) {
        tracing::warn!(peer = %identity, "Rejected connection: {}", e);
        state.record_client_error(e);
        // Close explicitly so the peer sees EOF instead of a silent socket
        if let Err(e) = conn.close().await {
            tracing::debug!(peer = %identity, "Error closing rejected connection: {}", e);
        }
        return;
    }

    tracing::info!(peer = %identity, "Client connected");

    let reader = FramedRead::new(read_half, codec);
    match read_loop(reader, &identity, &tx, &cancel).await {
        Ok(ReadExit::Eof) => tracing::info!(peer = %identity, "Client disconnected"),
        Ok(ReadExit::Cancelled) => tracing::debug!(peer = %identity, "Connection handler cancelled"),
        Ok(ReadExit::StreamClosed) => {
            tracing::debug!(peer = %identity, "Inbound stream dropped, closing connection")
        }
        Err(e) => {
            tracing::warn!(peer = %identity, "Client read failed: {}", e);
            state.record_client_error(e);
        }
    }

    match state.connections.remove(&conn) {
        Ok(_) => {}
        // Shutdown drains the pool before handlers finish
        Err(PoolError::NotFound(_)) => {}
        Err(e) => tracing::warn!(peer = %identity, "Failed to drop connection from pool: {}", e),
    }
    if let Err(e) = conn.close().await {
        tracing::debug!(peer = %identity, "Error closing connection: {}", e);
    }
}

async fn read_loop(
    mut reader: FramedRead<OwnedReadHalf, LineCodec>,
    identity: &PeerIdentity,
    tx: &MessageSender,
    cancel: &CancellationToken,
) -> Result<ReadExit, ProtocolError> {
    loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => return Ok(ReadExit::Cancelled),
            next = reader.next() => match next {
                Some(frame) => frame?,
                None => return Ok(ReadExit::Eof),
            },
        };

        tracing::debug!(peer = %identity, bytes = message.len(), "Received message");

        // A full channel blocks this peer only; shutdown still gets through
        tokio::select! {
            _ = cancel.cancelled() => return Ok(ReadExit::Cancelled),
            sent = tx.send(message) => {
                if sent.is_err() {
                    return Ok(ReadExit::StreamClosed);
                }
            }
        }
    }
}
