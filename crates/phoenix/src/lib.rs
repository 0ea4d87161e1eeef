//! Top-level facade crate for phoenix-wire.
//!
//! Re-exports the protocol core and the client layer so users can depend on a single crate.

pub mod core {
    pub use phoenix_core::*;
}

pub mod client {
    pub use phoenix_client::*;
}
