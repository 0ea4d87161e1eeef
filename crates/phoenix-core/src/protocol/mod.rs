//! Protocol modules.
//!
//! - `event`: closed inbound/outbound system event sets and reply detection.
//! - `message`: the envelope exchanged over the transport.
//! - `reply`: status + response carried by reply envelopes.
//! - `json`: the five-element JSON array wire codec.
//!
//! Everything here is panic-free: malformed input is reported as
//! `PhoenixError` instead of panicking.

pub mod event;
pub mod json;
pub mod message;
pub mod reply;

pub use event::{is_reply_event, reply_event_for, InboundEvent, OutboundEvent, REPLY_EVENT_PREFIX};
pub use json::{JsonSerializer, MessageSerializer};
pub use message::Message;
pub use reply::{Reply, ReplyStatus};
