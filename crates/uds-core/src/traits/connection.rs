//! Connection traits

use async_trait::async_trait;
use bytes::Bytes;

use crate::types::PeerIdentity;
use uds_protocol::ProtocolError;

/// Abstraction over one live peer connection
///
/// Implementations must serialize concurrent writers so that two messages
/// never interleave on the wire.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Stable identity of the peer, used as its pool key
    fn identity(&self) -> &PeerIdentity;

    /// Write one message, appending the delimiter if needed
    async fn send(&self, message: Bytes) -> Result<(), ProtocolError>;

    /// Signal the reader to stop and shut the write side down
    async fn close(&self) -> Result<(), ProtocolError>;

    /// Whether `close` has been called
    fn is_closed(&self) -> bool;
}
