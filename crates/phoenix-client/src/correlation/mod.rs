//! Request/reply correlation.
//!
//! Every push gets a fresh ref. When the server answers with `phx_reply`
//! carrying that ref, the registry renames the event to `chan_reply_<ref>` and
//! hands the message to whoever is waiting on it.

pub mod registry;

pub use registry::{PendingReply, RefGenerator, ReplyRegistry, Routed};
