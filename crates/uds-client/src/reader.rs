//! Client reader task

use std::sync::Arc;

use futures::StreamExt;
use tokio::net::unix::OwnedReadHalf;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;

use uds_core::{LinkState, MessageSender, StateCell};
use uds_protocol::LineCodec;

/// Read messages until the connection fails, the server hangs up, or the
/// client disconnects. Dropping `tx` on return closes the inbound stream.
pub(crate) async fn run_reader(
    mut reader: FramedRead<OwnedReadHalf, LineCodec>,
    tx: MessageSender,
    cancel: CancellationToken,
    link: Arc<StateCell>,
) {
    loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("Client reader cancelled");
                break;
            }
            next = reader.next() => match next {
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    tracing::warn!("Client reader loop exited: {}", e);
                    break;
                }
                None => {
                    tracing::info!("Server closed the connection");
                    break;
                }
            },
        };

        tracing::debug!(bytes = message.len(), "Received message");

        tokio::select! {
            _ = cancel.cancelled() => break,
            sent = tx.send(message) => {
                if sent.is_err() {
                    tracing::debug!("Inbound stream dropped, stopping reader");
                    break;
                }
            }
        }
    }

    // An explicit disconnect owns the Closing -> Closed step itself
    link.transition(LinkState::Open, LinkState::Closed);
}
