//! Echo server command

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use uds_core::config::ServerConfig;
use uds_server::SocketServer;

use crate::output::{format_message, print_error, print_info, print_success, print_warning};

/// Message that stops the echo server
pub const EXIT_COMMAND: &str = "exit";

/// Whether a received message asks the server to stop
///
/// Surrounding whitespace is ignored so `exit\r` from a CRLF client counts.
pub fn is_exit_command(message: &[u8]) -> bool {
    std::str::from_utf8(message).map(str::trim) == Ok(EXIT_COMMAND)
}

/// Run the echo server until `exit` is received or `cancel` fires
///
/// Every message is printed and then broadcast to all connected peers,
/// including the one that sent it.
pub async fn serve_command(config: ServerConfig, cancel: CancellationToken) -> Result<()> {
    let server = SocketServer::new(config);
    let mut messages = server
        .listen_and_receive()
        .await
        .with_context(|| format!("Failed to listen on {:?}", server.socket_path()))?;

    print_success(&format!("Listening on {:?}", server.socket_path()));
    print_info(&format!(
        "Send '{}' from a client or press Ctrl+C to stop",
        EXIT_COMMAND
    ));

    loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => break,
            message = messages.recv() => match message {
                Some(message) => message,
                None => {
                    print_warning("Listener stopped");
                    break;
                }
            },
        };

        println!("{}", format_message(&message));

        for failure in server.send_all(message.clone()).await {
            print_warning(&failure.to_string());
        }

        if is_exit_command(&message) {
            print_info("Exit requested, shutting down");
            break;
        }
    }

    if let Some(e) = server.listener_error() {
        print_error(&format!("Listener failed: {}", e));
    }

    server
        .shutdown()
        .await
        .context("Server did not shut down cleanly")?;
    print_success("Server stopped");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_command() {
        assert!(is_exit_command(b"exit"));
        assert!(is_exit_command(b"exit\r"));
        assert!(!is_exit_command(b"exiting"));
        assert!(!is_exit_command(b"EXIT"));
        assert!(!is_exit_command(&[0x65, 0x78, 0xff]));
    }

    #[tokio::test]
    async fn test_serve_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("serve.sock");
        let cancel = CancellationToken::new();

        let task = tokio::spawn(serve_command(
            ServerConfig::with_socket_path(&path),
            cancel.clone(),
        ));

        // Let the server bind before asking it to stop
        for _ in 0..100 {
            if path.exists() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        cancel.cancel();

        task.await.unwrap().unwrap();
        assert!(!path.exists());
    }
}
