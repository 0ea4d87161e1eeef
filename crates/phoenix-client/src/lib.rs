//! phoenix-client library entry.
//!
//! This crate consumes the protocol core: it defines the transport contract,
//! frames messages for text or binary transports, correlates replies to
//! requests and glues those together in a `Session`. Channel join/leave state
//! and heartbeats live above this layer.

pub mod config;
pub mod correlation;
pub mod session;
pub mod transport;

pub use session::Session;
