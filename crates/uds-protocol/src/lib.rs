//! uds-protocol: Wire framing for uds sockets
//!
//! Messages travel over a stream socket as raw byte payloads, each terminated
//! by a single newline byte (`0x0A`). There is no length prefix and no
//! escaping, so a payload must not contain the delimiter itself.

pub mod codec;
pub mod delimiter;
pub mod error;

pub use codec::{LineCodec, DEFAULT_MAX_FRAME_LENGTH};
pub use delimiter::{append_delimiter_if_absent, strip_delimiter_if_present, DELIMITER};
pub use error::ProtocolError;
