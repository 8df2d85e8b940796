//! Connection management

mod peer;
mod pool;

pub use peer::PeerConnection;
pub use pool::{ConnectionPool, POOL_SIZE_UNLIMITED};
