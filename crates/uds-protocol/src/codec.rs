//! Tokio codec for newline-delimited frames
//!
//! A single transport read may carry half a frame or several frames at once.
//! The decoder buffers until it sees a delimiter, so message boundaries never
//! depend on how the kernel happened to split the stream.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::delimiter::{append_delimiter_if_absent, strip_delimiter_if_present, DELIMITER};
use crate::error::ProtocolError;

/// Default maximum payload length (64 KiB)
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 64 * 1024;

/// Codec for encoding/decoding newline-delimited messages
#[derive(Debug, Clone)]
pub struct LineCodec {
    /// Largest payload accepted in either direction, excluding the delimiter
    max_frame_length: usize,
    /// Offset already scanned for a delimiter in the current buffer
    next_index: usize,
}

impl LineCodec {
    /// Create a new codec with the default frame limit
    pub fn new() -> Self {
        Self::with_max_frame_length(DEFAULT_MAX_FRAME_LENGTH)
    }

    /// Create a new codec with a custom frame limit
    pub fn with_max_frame_length(max_frame_length: usize) -> Self {
        Self {
            max_frame_length,
            next_index: 0,
        }
    }

    /// Maximum payload length accepted by this codec
    pub fn max_frame_length(&self) -> usize {
        self.max_frame_length
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = Bytes;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let found = src[self.next_index..]
            .iter()
            .position(|b| *b == DELIMITER)
            .map(|offset| self.next_index + offset);

        let Some(position) = found else {
            if src.len() > self.max_frame_length {
                return Err(ProtocolError::FrameTooLarge {
                    size: src.len(),
                    max: self.max_frame_length,
                });
            }
            // Need more data
            self.next_index = src.len();
            return Ok(None);
        };

        self.next_index = 0;
        if position > self.max_frame_length {
            return Err(ProtocolError::FrameTooLarge {
                size: position,
                max: self.max_frame_length,
            });
        }

        let frame = src.split_to(position + 1).freeze();
        Ok(Some(strip_delimiter_if_present(frame)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }

        // Peer closed without terminating its last message
        self.next_index = 0;
        if src.is_empty() {
            return Ok(None);
        }
        tracing::debug!("Delivering {} unterminated bytes at EOF", src.len());
        Ok(Some(src.split_to(src.len()).freeze()))
    }
}

impl Encoder<Bytes> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, message: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let framed = append_delimiter_if_absent(message);
        let payload_len = framed.len() - 1;

        if payload_len > self.max_frame_length {
            return Err(ProtocolError::FrameTooLarge {
                size: payload_len,
                max: self.max_frame_length,
            });
        }

        dst.reserve(framed.len());
        dst.extend_from_slice(&framed);
        Ok(())
    }
}
