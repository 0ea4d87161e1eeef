//! Message envelope.
//!
//! A `Message` is a value: created per outbound call or per inbound frame and
//! owned by whichever layer holds it. `event` is the only field that can be
//! rewritten after construction (reply routing renames `phx_reply` to
//! `chan_reply_<ref>`). The parsed reply is memoized in a write-once cell.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use serde_json::{Map, Value};

use crate::error::{PhoenixError, Result};
use crate::protocol::event::{is_reply_event, InboundEvent};
use crate::protocol::reply::Reply;

/// One protocol unit. Equality and hashing use `topic`, `event` and `ref` only.
#[derive(Clone, Default)]
pub struct Message {
    topic: Option<String>,
    event: Option<String>,
    payload: Option<Value>,
    r#ref: Option<String>,
    join_ref: Option<String>,
    /// `None` inside means "parsed, not a reply".
    reply: OnceLock<Option<Reply>>,
}

impl Message {
    /// Empty message: every field absent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the topic.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Set the event; clears any memoized reply.
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.set_event(event);
        self
    }

    /// Set the payload; clears any memoized reply.
    pub fn with_payload(mut self, payload: impl Into<Value>) -> Self {
        self.payload = Some(payload.into());
        self.reply = OnceLock::new();
        self
    }

    /// Set the message ref.
    pub fn with_ref(mut self, r#ref: impl Into<String>) -> Self {
        self.r#ref = Some(r#ref.into());
        self
    }

    /// Set the join ref.
    pub fn with_join_ref(mut self, join_ref: impl Into<String>) -> Self {
        self.join_ref = Some(join_ref.into());
        self
    }

    /// Assemble from optional parts (used by decoders).
    pub fn from_parts(
        join_ref: Option<String>,
        r#ref: Option<String>,
        topic: Option<String>,
        event: Option<String>,
        payload: Option<Value>,
    ) -> Self {
        Self {
            topic,
            event,
            payload,
            r#ref,
            join_ref,
            reply: OnceLock::new(),
        }
    }

    /// Build a `phx_reply` envelope answering `r#ref`.
    pub fn reply(
        topic: impl Into<String>,
        r#ref: impl Into<String>,
        join_ref: Option<String>,
        reply: &Reply,
    ) -> Self {
        Self::from_parts(
            join_ref,
            Some(r#ref.into()),
            Some(topic.into()),
            Some(InboundEvent::PhxReply.as_str().to_owned()),
            Some(reply.to_payload()),
        )
    }

    /// Topic, if set.
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// Event name, if set.
    pub fn event(&self) -> Option<&str> {
        self.event.as_deref()
    }

    /// Raw payload, if set.
    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// Payload as an object, if it is one.
    pub fn payload_object(&self) -> Option<&Map<String, Value>> {
        self.payload.as_ref().and_then(Value::as_object)
    }

    /// Message ref, if set.
    pub fn r#ref(&self) -> Option<&str> {
        self.r#ref.as_deref()
    }

    /// Join ref, if set.
    pub fn join_ref(&self) -> Option<&str> {
        self.join_ref.as_deref()
    }

    /// Rewrite the event. Drops any memoized reply so classification follows
    /// the new name.
    pub fn set_event(&mut self, event: impl Into<String>) {
        self.event = Some(event.into());
        self.reply = OnceLock::new();
    }

    /// Parse the payload as a reply if the event is reply-carrying.
    ///
    /// Returns `Ok(None)` for ordinary events. The first successful parse is
    /// memoized; failures are not cached and recompute to the same error.
    pub fn parse_reply(&self) -> Result<Option<&Reply>> {
        if let Some(cached) = self.reply.get() {
            return Ok(cached.as_ref());
        }

        let event = self.event.as_deref().ok_or_else(|| {
            PhoenixError::InvalidState("reply parsing requires an event".into())
        })?;

        let parsed = if is_reply_event(event) {
            Some(Reply::from_payload(self.payload.as_ref())?)
        } else {
            None
        };

        // Concurrent callers may both parse; only the first value is stored.
        Ok(self.reply.get_or_init(|| parsed).as_ref())
    }

    /// Consume into `(join_ref, ref, topic, event, payload)`.
    pub fn into_parts(
        self,
    ) -> (
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<Value>,
    ) {
        (self.join_ref, self.r#ref, self.topic, self.event, self.payload)
    }
}

impl PartialEq for Message {
    // Payload is left out: deep equality of dynamic maps is not stable across
    // codec round trips.
    fn eq(&self, other: &Self) -> bool {
        self.topic == other.topic && self.event == other.event && self.r#ref == other.r#ref
    }
}

impl Eq for Message {}

impl Hash for Message {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.topic.hash(state);
        self.event.hash(state);
        self.r#ref.hash(state);
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}: {}",
            self.r#ref.as_deref().unwrap_or_default(),
            self.topic.as_deref().unwrap_or_default(),
            self.event.as_deref().unwrap_or_default(),
        )
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("topic", &self.topic)
            .field("event", &self.event)
            .field("payload", &self.payload)
            .field("ref", &self.r#ref)
            .field("join_ref", &self.join_ref)
            .finish_non_exhaustive()
    }
}
