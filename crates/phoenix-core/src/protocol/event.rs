//! System event taxonomy.
//!
//! Inbound names are parsed permissively: anything outside the closed set is a
//! user-defined event and yields `None`. Outbound names are only ever produced
//! internally, so an unknown name is a programming error (`InvalidEvent`).

use std::fmt;
use std::str::FromStr;

use crate::error::{PhoenixError, Result};

/// Prefix of the synthetic per-request reply event (`chan_reply_<ref>`).
pub const REPLY_EVENT_PREFIX: &str = "chan_reply_";

/// System events a client receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboundEvent {
    PhxReply,
    PhxClose,
    PhxError,
}

impl InboundEvent {
    pub const ALL: [InboundEvent; 3] = [
        InboundEvent::PhxReply,
        InboundEvent::PhxClose,
        InboundEvent::PhxError,
    ];

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            InboundEvent::PhxReply => "phx_reply",
            InboundEvent::PhxClose => "phx_close",
            InboundEvent::PhxError => "phx_error",
        }
    }

    /// Exact match against the closed set; unknown names are not an error.
    pub fn parse(name: &str) -> Option<InboundEvent> {
        match name {
            "phx_reply" => Some(InboundEvent::PhxReply),
            "phx_close" => Some(InboundEvent::PhxClose),
            "phx_error" => Some(InboundEvent::PhxError),
            _ => None,
        }
    }
}

impl fmt::Display for InboundEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// System events a client sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutboundEvent {
    PhxJoin,
    PhxLeave,
}

impl OutboundEvent {
    pub const ALL: [OutboundEvent; 2] = [OutboundEvent::PhxJoin, OutboundEvent::PhxLeave];

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            OutboundEvent::PhxJoin => "phx_join",
            OutboundEvent::PhxLeave => "phx_leave",
        }
    }

    /// Strict parse: anything outside the closed set is `InvalidEvent`.
    pub fn parse(name: &str) -> Result<OutboundEvent> {
        match name {
            "phx_join" => Ok(OutboundEvent::PhxJoin),
            "phx_leave" => Ok(OutboundEvent::PhxLeave),
            other => Err(PhoenixError::InvalidEvent(format!(
                "unknown outbound event: {other}"
            ))),
        }
    }
}

impl FromStr for OutboundEvent {
    type Err = PhoenixError;

    fn from_str(s: &str) -> Result<Self> {
        OutboundEvent::parse(s)
    }
}

impl fmt::Display for OutboundEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True for `phx_reply` and for any `chan_reply_*` event.
pub fn is_reply_event(name: &str) -> bool {
    name == InboundEvent::PhxReply.as_str() || name.starts_with(REPLY_EVENT_PREFIX)
}

/// Synthetic reply event name for a request ref.
pub fn reply_event_for(msg_ref: &str) -> String {
    format!("{REPLY_EVENT_PREFIX}{msg_ref}")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn inbound_names_round_trip() {
        for ev in InboundEvent::ALL {
            assert_eq!(InboundEvent::parse(ev.as_str()), Some(ev));
        }
    }

    #[test]
    fn unknown_inbound_is_none() {
        assert_eq!(InboundEvent::parse("new_msg"), None);
        assert_eq!(InboundEvent::parse("PHX_REPLY"), None);
        assert_eq!(InboundEvent::parse("phx_join"), None);
    }

    #[test]
    fn outbound_parse_is_strict() {
        assert_eq!(OutboundEvent::parse("phx_join").unwrap(), OutboundEvent::PhxJoin);
        assert_eq!("phx_leave".parse::<OutboundEvent>().unwrap(), OutboundEvent::PhxLeave);

        let err = OutboundEvent::parse("phx_reply").expect_err("inbound name is not outbound");
        assert_eq!(err.code().as_str(), "INVALID_EVENT");
        assert!(OutboundEvent::parse("").is_err());
    }

    #[test]
    fn reply_detection() {
        assert!(is_reply_event("phx_reply"));
        assert!(is_reply_event("chan_reply_123"));
        assert!(is_reply_event(&reply_event_for("7")));
        assert!(!is_reply_event("phx_join"));
        assert!(!is_reply_event("chan_repl"));
        assert!(!is_reply_event("my_chan_reply_1"));
    }
}
