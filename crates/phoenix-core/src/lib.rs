//! phoenix-core: transport-agnostic protocol primitives for Phoenix channels.
//!
//! This crate defines the message envelope, the event taxonomy, reply parsing
//! and the JSON wire codec. It carries no transport or runtime dependencies so
//! it can be reused by clients, servers and tooling alike.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `PhoenixError`/`Result` so a malformed
//! frame never takes the process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{PhoenixError, Result};
pub use protocol::{
    InboundEvent, JsonSerializer, Message, MessageSerializer, OutboundEvent, Reply, ReplyStatus,
};
