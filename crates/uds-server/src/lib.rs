//! uds-server: Socket server accepting many concurrent peers
//!
//! The server listens on a filesystem socket path, registers each accepted
//! peer in a bounded connection pool, runs one reader task per peer, and
//! fans every inbound message into a single [`MessageStream`]. Outbound
//! messages go to every pooled peer ([`SocketServer::send_all`]) or to one
//! of them ([`SocketServer::send_to`]).
//!
//! [`MessageStream`]: uds_core::MessageStream

pub mod connection;
pub mod server;
pub mod state;

pub use connection::{ConnectionPool, PeerConnection, POOL_SIZE_UNLIMITED};
pub use server::SocketServer;
pub use state::ServerState;
