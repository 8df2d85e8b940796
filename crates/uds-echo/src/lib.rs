//! uds-echo: example programs for uds sockets
//!
//! Provides the `uds-echo` CLI with an echo server and an interactive
//! line client.

pub mod commands;
pub mod output;
