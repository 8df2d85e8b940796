//! Message delimiter helpers
//!
//! Both helpers only ever look at the final byte of a message. A delimiter
//! in the middle of a payload is left alone.

use bytes::{BufMut, Bytes, BytesMut};

/// Byte that terminates every frame on the wire
pub const DELIMITER: u8 = b'\n';

/// Append the delimiter unless the message already ends with it
///
/// An empty message becomes a single delimiter byte.
pub fn append_delimiter_if_absent(message: Bytes) -> Bytes {
    if message.last() == Some(&DELIMITER) {
        return message;
    }

    let mut framed = BytesMut::with_capacity(message.len() + 1);
    framed.extend_from_slice(&message);
    framed.put_u8(DELIMITER);
    framed.freeze()
}

/// Remove exactly one trailing delimiter if present
pub fn strip_delimiter_if_present(mut message: Bytes) -> Bytes {
    if message.last() == Some(&DELIMITER) {
        message.truncate(message.len() - 1);
    }
    message
}
