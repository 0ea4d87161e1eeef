//! JSON wire codec.
//!
//! Wire form is a five-element array `[join_ref, ref, topic, event, payload]`.
//! Absent fields are `null`. The payload slot accepts any JSON value and is
//! kept as a raw `serde_json::Value`; the codec has no schema for event
//! payloads.

use bytes::Bytes;
use serde_json::Value;

use crate::error::{PhoenixError, Result};
use crate::protocol::message::Message;
use crate::protocol::reply::json_kind;

const SLOT_NAMES: [&str; 4] = ["join_ref", "ref", "topic", "event"];

/// Bidirectional transform between a `Message` and its wire text.
pub trait MessageSerializer: Send + Sync {
    fn serialize(&self, message: &Message) -> Result<String>;

    fn deserialize(&self, text: &str) -> Result<Message>;

    /// Encode for a binary-mode transport (UTF-8 text in a binary frame).
    fn serialize_bytes(&self, message: &Message) -> Result<Bytes> {
        self.serialize(message).map(Bytes::from)
    }

    fn deserialize_bytes(&self, bytes: &[u8]) -> Result<Message> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| PhoenixError::MalformedWireFormat(format!("utf8 invalid: {e}")))?;
        self.deserialize(text)
    }
}

/// Default serializer, Phoenix `vsn=2.0.0` array format.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    /// Stateless JSON array codec.
    pub fn new() -> Self {
        Self
    }
}

impl MessageSerializer for JsonSerializer {
    fn serialize(&self, message: &Message) -> Result<String> {
        let wire = (
            message.join_ref(),
            message.r#ref(),
            message.topic(),
            message.event(),
            message.payload(),
        );
        serde_json::to_string(&wire)
            .map_err(|e| PhoenixError::MalformedWireFormat(format!("json encode failed: {e}")))
    }

    fn deserialize(&self, text: &str) -> Result<Message> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| PhoenixError::MalformedWireFormat(format!("invalid json: {e}")))?;

        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(PhoenixError::MalformedWireFormat(format!(
                    "expected array, got {}",
                    json_kind(&other)
                )));
            }
        };
        if items.len() != 5 {
            return Err(PhoenixError::MalformedWireFormat(format!(
                "expected 5 elements, got {}",
                items.len()
            )));
        }

        let mut it = items.into_iter();
        let mut scalars: [Option<String>; 4] = Default::default();
        for (slot, name) in scalars.iter_mut().zip(SLOT_NAMES) {
            *slot = string_slot(it.next(), name)?;
        }
        let payload = match it.next() {
            None | Some(Value::Null) => None,
            Some(v) => Some(v),
        };

        let [join_ref, msg_ref, topic, event] = scalars;
        tracing::trace!(?topic, ?event, ?msg_ref, "decoded frame");
        Ok(Message::from_parts(join_ref, msg_ref, topic, event, payload))
    }
}

fn string_slot(v: Option<Value>, name: &str) -> Result<Option<String>> {
    match v {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(PhoenixError::MalformedWireFormat(format!(
            "{name} must be a string or null, got {}",
            json_kind(&other)
        ))),
    }
}
