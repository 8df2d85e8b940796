//! Inbound message stream
//!
//! Every connection handler holds a [`MessageSender`]; the owning process
//! holds the single [`MessageStream`]. The stream ends once every sender is
//! gone, which only happens after the last handler has exited.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tokio::sync::mpsc;

/// Producer half, cloned into each connection handler
pub type MessageSender = mpsc::Sender<Bytes>;

/// Create a bounded inbound channel
///
/// Producers wait when the consumer falls `capacity` messages behind.
pub fn message_channel(capacity: usize) -> (MessageSender, MessageStream) {
    let (tx, rx) = mpsc::channel(capacity);
    (tx, MessageStream { rx })
}

/// Ordered stream of inbound messages, delimiter already stripped
#[derive(Debug)]
pub struct MessageStream {
    rx: mpsc::Receiver<Bytes>,
}

impl MessageStream {
    /// Wait for the next message; `None` once the stream is closed
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    /// Take a message if one is already queued
    pub fn try_recv(&mut self) -> Option<Bytes> {
        self.rx.try_recv().ok()
    }
}

impl Stream for MessageStream {
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_stream_preserves_order() {
        let (tx, mut stream) = message_channel(4);
        tx.send(Bytes::from("first")).await.unwrap();
        tx.send(Bytes::from("second")).await.unwrap();
        drop(tx);

        assert_eq!(stream.recv().await.unwrap(), Bytes::from("first"));
        assert_eq!(stream.next().await.unwrap(), Bytes::from("second"));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_stream_stays_open_while_any_sender_lives() {
        let (tx, mut stream) = message_channel(4);
        let tx2 = tx.clone();
        drop(tx);

        assert!(stream.try_recv().is_none());
        tx2.send(Bytes::from("late")).await.unwrap();
        assert_eq!(stream.recv().await.unwrap(), Bytes::from("late"));

        drop(tx2);
        assert!(stream.recv().await.is_none());
    }
}
