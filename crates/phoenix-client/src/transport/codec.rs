//! Frame codec for the transport layer.
//!
//! - Text frames carry the JSON array directly
//! - Binary frames carry the same JSON as UTF-8 bytes (binary mode)

use bytes::Bytes;
use phoenix_core::error::Result;
use phoenix_core::{Message, MessageSerializer};

/// One transport frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
}

impl Frame {
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(s) => s.len(),
            Frame::Binary(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Encode as a binary frame in binary mode, a text frame otherwise.
pub fn encode(
    serializer: &dyn MessageSerializer,
    message: &Message,
    binary_mode: bool,
) -> Result<Frame> {
    if binary_mode {
        serializer.serialize_bytes(message).map(Frame::Binary)
    } else {
        serializer.serialize(message).map(Frame::Text)
    }
}

/// Decode either frame kind into a message.
pub fn decode(serializer: &dyn MessageSerializer, frame: &Frame) -> Result<Message> {
    match frame {
        Frame::Text(s) => serializer.deserialize(s),
        Frame::Binary(b) => serializer.deserialize_bytes(b),
    }
}
