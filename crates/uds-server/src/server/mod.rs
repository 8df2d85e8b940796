//! Socket server
//!
//! Accepts incoming peers and spawns a handler for each.

mod handler;
mod listener;

pub use listener::SocketServer;
