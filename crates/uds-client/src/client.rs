//! Socket client implementation

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError};

use bytes::Bytes;
use futures::SinkExt;
use tokio::io::AsyncWriteExt;
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::UnixStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

use uds_core::config::ClientConfig;
use uds_core::{message_channel, ConnectionError, LinkState, MessageStream, StateCell};
use uds_protocol::LineCodec;

use crate::reader::run_reader;

/// One dialed connection
struct Session {
    /// Server socket this session is connected to
    path: PathBuf,
    writer: FramedWrite<OwnedWriteHalf, LineCodec>,
    reader: JoinHandle<()>,
}

/// Client for a uds socket server
///
/// A client holds at most one connection at a time. After the connection
/// ends (disconnect or server hang-up) the same client can connect again.
///
/// A write blocks while the server is not reading. `disconnect` cancels the
/// session token before it takes the session lock, so a stalled `send`
/// gives the lock up instead of holding it forever.
pub struct SocketClient {
    config: ClientConfig,
    link: Arc<StateCell>,
    /// Cancel token of the current session
    signal: std::sync::Mutex<CancellationToken>,
    session: Mutex<Option<Session>>,
}

impl SocketClient {
    /// Create a new client with default settings
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom settings
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config,
            link: Arc::new(StateCell::new()),
            signal: std::sync::Mutex::new(CancellationToken::new()),
            session: Mutex::new(None),
        }
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> LinkState {
        self.link.get()
    }

    /// Whether the connection is open
    pub fn is_connected(&self) -> bool {
        self.link.is_open()
    }

    /// Socket path of the current or last connection
    pub async fn peer_path(&self) -> Option<PathBuf> {
        self.session.lock().await.as_ref().map(|s| s.path.clone())
    }

    fn signal(&self) -> CancellationToken {
        self.signal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Connect to the configured socket path
    pub async fn connect_default(&self) -> Result<MessageStream, ConnectionError> {
        let path = self.config.socket_path.clone();
        self.connect(path).await
    }

    /// Dial a server socket and start the reader task
    ///
    /// Returns the stream server messages are delivered to. The stream ends
    /// when the connection does.
    pub async fn connect(&self, path: impl AsRef<Path>) -> Result<MessageStream, ConnectionError> {
        self.config.validate()?;
        let path = path.as_ref().to_path_buf();

        let mut session = self.session.lock().await;
        if matches!(self.state(), LinkState::Open | LinkState::Closing) {
            return Err(ConnectionError::AlreadyConnected);
        }

        // Reap the reader of a connection the server already ended
        if let Some(previous) = session.take() {
            if let Err(e) = previous.reader.await {
                tracing::warn!("Previous reader task failed: {}", e);
            }
        }

        tracing::debug!("Connecting to {:?}", path);

        let stream = match UnixStream::connect(&path).await {
            Ok(stream) => stream,
            Err(source) => {
                self.link.set(LinkState::Closed);
                return Err(ConnectionError::Dial { path, source });
            }
        };

        let codec = LineCodec::with_max_frame_length(self.config.max_frame_length);
        let (read_half, write_half) = stream.into_split();
        let (tx, rx) = message_channel(self.config.channel_capacity);

        let cancel = CancellationToken::new();
        *self.signal.lock().unwrap_or_else(PoisonError::into_inner) = cancel.clone();

        self.link.set(LinkState::Open);
        let reader = tokio::spawn(run_reader(
            FramedRead::new(read_half, codec.clone()),
            tx,
            cancel,
            Arc::clone(&self.link),
        ));

        tracing::info!("Connected to {:?}", path);

        *session = Some(Session {
            path,
            writer: FramedWrite::new(write_half, codec),
            reader,
        });

        Ok(rx)
    }

    /// Send one message, appending the delimiter if needed
    ///
    /// Fails with `NotConnected` if `disconnect` runs while the write is
    /// still waiting on the socket.
    pub async fn send(&self, message: impl Into<Bytes>) -> Result<(), ConnectionError> {
        if !self.is_connected() {
            return Err(ConnectionError::NotConnected);
        }

        let message: Bytes = message.into();
        let cancel = self.signal();

        let write = async {
            let mut session = self.session.lock().await;
            let session = session.as_mut().ok_or(ConnectionError::NotConnected)?;
            session.writer.send(message).await?;
            Ok::<(), ConnectionError>(())
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ConnectionError::NotConnected),
            result = write => result,
        }
    }

    /// Close the connection and wait for the reader task to finish
    ///
    /// The inbound stream ends once this returns.
    pub async fn disconnect(&self) -> Result<(), ConnectionError> {
        self.link.transition(LinkState::Open, LinkState::Closing);
        self.signal().cancel();

        let mut guard = self.session.lock().await;
        let Some(mut session) = guard.take() else {
            return Err(ConnectionError::NotConnected);
        };
        self.link.set(LinkState::Closing);

        // Completed sends are already flushed; a cancelled one may leave a
        // partial frame that must not be flushed to a server not reading
        if let Err(e) = session.writer.get_mut().shutdown().await {
            tracing::debug!("Error shutting down connection to {:?}: {}", session.path, e);
        }
        drop(session.writer);

        let joined = session.reader.await;
        self.link.set(LinkState::Closed);
        tracing::info!("Disconnected from {:?}", session.path);

        joined.map_err(|e| ConnectionError::Task(e.to_string()))
    }
}

impl Default for SocketClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::UnixListener;
    use tokio::time::timeout;

    const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    fn socket_in(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("client-test.sock")
    }

    #[tokio::test]
    async fn test_connect_missing_socket() {
        let dir = tempfile::tempdir().unwrap();
        let client = SocketClient::new();

        let result = client.connect(socket_in(&dir)).await;

        assert!(matches!(result, Err(ConnectionError::Dial { .. })));
        assert_eq!(client.state(), LinkState::Closed);
    }

    #[tokio::test]
    async fn test_send_before_connect() {
        let client = SocketClient::new();

        let result = client.send("hello").await;
        assert!(matches!(result, Err(ConnectionError::NotConnected)));

        let result = client.disconnect().await;
        assert!(matches!(result, Err(ConnectionError::NotConnected)));
    }

    #[tokio::test]
    async fn test_exchange_with_raw_server() {
        let dir = tempfile::tempdir().unwrap();
        let path = socket_in(&dir);
        let listener = UnixListener::bind(&path).unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();

            // Two frames in one write must arrive as two messages
            write_half.write_all(b"Hello Client!\nsecond\n").await.unwrap();

            let mut line = String::new();
            BufReader::new(read_half).read_line(&mut line).await.unwrap();
            line
        });

        let client = SocketClient::new();
        let mut stream = client.connect(&path).await.unwrap();
        assert!(client.is_connected());
        assert_eq!(client.peer_path().await, Some(path.clone()));

        let first = timeout(TEST_TIMEOUT, stream.recv()).await.unwrap().unwrap();
        assert_eq!(first.as_ref(), b"Hello Client!");
        let second = timeout(TEST_TIMEOUT, stream.recv()).await.unwrap().unwrap();
        assert_eq!(second.as_ref(), b"second");

        client.send("Hello Server!").await.unwrap();
        let received = timeout(TEST_TIMEOUT, server).await.unwrap().unwrap();
        assert_eq!(received, "Hello Server!\n");
    }

    #[tokio::test]
    async fn test_server_hangup_closes_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = socket_in(&dir);
        let listener = UnixListener::bind(&path).unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let client = SocketClient::new();
        let mut stream = client.connect(&path).await.unwrap();
        server.await.unwrap();

        assert!(timeout(TEST_TIMEOUT, stream.recv()).await.unwrap().is_none());
        assert_eq!(client.state(), LinkState::Closed);
        assert!(matches!(
            client.send("too late").await,
            Err(ConnectionError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_disconnect_and_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let path = socket_in(&dir);
        let listener = UnixListener::bind(&path).unwrap();

        let server = tokio::spawn(async move {
            let mut accepted = Vec::new();
            for _ in 0..2 {
                let (stream, _) = listener.accept().await.unwrap();
                accepted.push(stream);
            }
            accepted
        });

        let client = SocketClient::new();
        let mut stream = client.connect(&path).await.unwrap();

        client.disconnect().await.unwrap();
        assert_eq!(client.state(), LinkState::Closed);
        assert!(timeout(TEST_TIMEOUT, stream.recv()).await.unwrap().is_none());
        assert!(matches!(
            client.send("after disconnect").await,
            Err(ConnectionError::NotConnected)
        ));

        let _stream = client.connect(&path).await.unwrap();
        assert!(client.is_connected());
        assert!(matches!(
            client.connect(&path).await,
            Err(ConnectionError::AlreadyConnected)
        ));

        let accepted = timeout(TEST_TIMEOUT, server).await.unwrap().unwrap();
        assert_eq!(accepted.len(), 2);
        client.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_disconnect_interrupts_stalled_send() {
        let dir = tempfile::tempdir().unwrap();
        let path = socket_in(&dir);
        let listener = UnixListener::bind(&path).unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            stream
        });

        let client = Arc::new(SocketClient::new());
        let _stream = client.connect(&path).await.unwrap();
        // Held open but never read, so the client's writes back up
        let _server_side = timeout(TEST_TIMEOUT, server).await.unwrap().unwrap();

        let sender = {
            let client = Arc::clone(&client);
            let chunk = Bytes::from(vec![b'x'; 32 * 1024]);
            tokio::spawn(async move {
                loop {
                    if let Err(e) = client.send(chunk.clone()).await {
                        return e;
                    }
                }
            })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!sender.is_finished());

        timeout(TEST_TIMEOUT, client.disconnect())
            .await
            .expect("disconnect blocked behind a stalled send")
            .unwrap();
        assert_eq!(client.state(), LinkState::Closed);

        let err = timeout(TEST_TIMEOUT, sender).await.unwrap().unwrap();
        assert!(matches!(err, ConnectionError::NotConnected));
    }
}
