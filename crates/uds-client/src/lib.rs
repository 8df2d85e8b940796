//! uds-client: Client side of a uds socket
//!
//! A [`SocketClient`] dials one server socket, runs a single reader task
//! that delivers inbound messages to a [`MessageStream`], and writes
//! outbound messages with the delimiter appended.
//!
//! [`MessageStream`]: uds_core::MessageStream

mod client;
mod reader;

pub use client::SocketClient;
