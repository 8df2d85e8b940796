//! uds-core: Core abstractions and configuration for uds sockets
//!
//! This crate provides shared types, traits, and configuration structures
//! used by the server, client, and echo CLI components.

pub mod config;
pub mod error;
pub mod stream;
pub mod traits;
pub mod types;

pub use error::{ConnectionError, DeliveryError, PoolError, UdsError};
pub use stream::{message_channel, MessageSender, MessageStream};
pub use traits::Connection;
pub use types::{LinkState, PeerIdentity, StateCell};
