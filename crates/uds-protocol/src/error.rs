//! Protocol error types

use thiserror::Error;

/// Errors that can occur while framing messages
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Frame exceeds the configured maximum length
    #[error("Frame too large: {size} bytes exceeds maximum of {max} bytes")]
    FrameTooLarge { size: usize, max: usize },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
