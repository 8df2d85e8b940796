//! Server-side handle for one accepted peer

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::SinkExt;
use tokio::io::AsyncWriteExt;
use tokio::net::unix::OwnedWriteHalf;
use tokio::sync::Mutex;
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;

use uds_core::{Connection, PeerIdentity};
use uds_protocol::{LineCodec, ProtocolError};

/// A connected peer as seen by the pool
///
/// The read half belongs to the peer's handler task. The write half lives
/// here behind an async mutex, so broadcasts, unicasts and `close` from any
/// task take turns instead of interleaving bytes on the wire.
///
/// Waiting for the mutex and the write itself both race the connection's
/// cancel token. A peer that stops reading can stall a write, but never
/// past `close` or server shutdown.
pub struct PeerConnection {
    identity: PeerIdentity,
    writer: Mutex<FramedWrite<OwnedWriteHalf, LineCodec>>,
    /// Stops the handler's read loop and any pending write
    cancel: CancellationToken,
    closed: AtomicBool,
}

impl PeerConnection {
    /// Wrap the write half of an accepted stream
    pub fn new(
        identity: PeerIdentity,
        writer: OwnedWriteHalf,
        codec: LineCodec,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            identity,
            writer: Mutex::new(FramedWrite::new(writer, codec)),
            cancel,
            closed: AtomicBool::new(false),
        }
    }
}

fn closed_error() -> ProtocolError {
    ProtocolError::Io(io::Error::new(
        io::ErrorKind::NotConnected,
        "connection closed",
    ))
}

#[async_trait]
impl Connection for PeerConnection {
    fn identity(&self) -> &PeerIdentity {
        &self.identity
    }

    async fn send(&self, message: Bytes) -> Result<(), ProtocolError> {
        if self.is_closed() {
            return Err(closed_error());
        }

        let write = async {
            let mut writer = self.writer.lock().await;
            writer.send(message).await
        };

        // A half-written frame is abandoned; the connection is going away
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(closed_error()),
            result = write => {
                result?;
                tracing::trace!(peer = %self.identity, "Message written");
                Ok(())
            }
        }
    }

    async fn close(&self) -> Result<(), ProtocolError> {
        // Releases the writer from any send stuck on a full socket
        self.cancel.cancel();
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        // Completed sends are already flushed; anything still buffered
        // belongs to a cancelled send and is dropped rather than flushed
        let mut writer = self.writer.lock().await;
        writer.get_mut().shutdown().await?;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
