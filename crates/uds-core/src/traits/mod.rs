//! Core traits

mod connection;

pub use connection::Connection;
