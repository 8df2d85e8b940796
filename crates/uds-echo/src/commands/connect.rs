//! Interactive client command

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use uds_client::SocketClient;
use uds_core::config::ClientConfig;
use uds_core::ConnectionError;

use crate::output::{format_message, print_info, print_success};

/// Connect to a server and relay stdin lines to it
///
/// Each line read from stdin is sent as one message; each message from the
/// server is printed. Returns when stdin ends, the server closes the
/// connection, or `cancel` fires.
pub async fn connect_command(config: ClientConfig, cancel: CancellationToken) -> Result<()> {
    let client = SocketClient::with_config(config);
    let path = client.config().socket_path.clone();

    let mut messages = client
        .connect_default()
        .await
        .with_context(|| format!("Failed to connect to {:?}", path))?;

    print_success(&format!("Connected to {:?}", path));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            message = messages.recv() => match message {
                Some(message) => println!("{}", format_message(&message)),
                None => {
                    print_info("Server closed the connection");
                    break;
                }
            },

            line = lines.next_line() => {
                match line.context("Failed to read stdin")? {
                    Some(line) => client
                        .send(line)
                        .await
                        .context("Failed to send message")?,
                    None => {
                        tracing::debug!("stdin closed");
                        break;
                    }
                }
            }
        }
    }

    match client.disconnect().await {
        Ok(()) | Err(ConnectionError::NotConnected) => Ok(()),
        Err(e) => Err(e).context("Failed to disconnect"),
    }
}
