use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;

use phoenix_core::error::{PhoenixError, Result};
use phoenix_core::protocol::{reply_event_for, InboundEvent};
use phoenix_core::Message;

/// Monotonic ref source ("1", "2", ...).
#[derive(Debug)]
pub struct RefGenerator {
    next: AtomicU64,
}

impl Default for RefGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl RefGenerator {
    /// Generator whose first ref is "1".
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next ref.
    pub fn next_ref(&self) -> String {
        self.next.fetch_add(1, Ordering::Relaxed).to_string()
    }
}

/// Outcome of routing an inbound message.
#[derive(Debug)]
pub enum Routed {
    /// Handed to the waiter registered for its ref.
    Delivered,
    /// Not a reply anyone is waiting for; the caller keeps it.
    Unmatched(Message),
}

#[derive(Debug)]
struct Waiter {
    /// Distinguishes registrations that reuse a ref.
    token: u64,
    tx: oneshot::Sender<Message>,
}

type PendingMap = DashMap<String, Waiter>;

/// Pending replies keyed by ref.
#[derive(Clone, Default)]
pub struct ReplyRegistry {
    pending: Arc<PendingMap>,
    tokens: Arc<AtomicU64>,
}

impl ReplyRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start waiting for the reply to `msg_ref`. Re-registering a ref drops
    /// the previous waiter. Dropping the returned handle unregisters it.
    pub fn register(&self, msg_ref: impl Into<String>) -> PendingReply {
        let msg_ref = msg_ref.into();
        let token = self.tokens.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(msg_ref.clone(), Waiter { token, tx });
        PendingReply {
            msg_ref,
            token,
            rx,
            pending: self.pending.clone(),
        }
    }

    /// Deliver a `phx_reply` to its waiter, renamed to `chan_reply_<ref>`.
    /// Anything else comes back untouched in `Routed::Unmatched`.
    pub fn route(&self, mut msg: Message) -> Routed {
        let is_phx_reply = msg
            .event()
            .and_then(InboundEvent::parse)
            .is_some_and(|ev| ev == InboundEvent::PhxReply);
        if !is_phx_reply {
            return Routed::Unmatched(msg);
        }

        let Some(msg_ref) = msg.r#ref().map(str::to_owned) else {
            return Routed::Unmatched(msg);
        };
        let Some((_, waiter)) = self.pending.remove(&msg_ref) else {
            tracing::debug!(msg_ref = %msg_ref, "reply for unknown ref");
            return Routed::Unmatched(msg);
        };

        msg.set_event(reply_event_for(&msg_ref));
        match waiter.tx.send(msg) {
            Ok(()) => Routed::Delivered,
            Err(mut msg) => {
                tracing::debug!(msg_ref = %msg_ref, "reply waiter gone");
                msg.set_event(InboundEvent::PhxReply.as_str());
                Routed::Unmatched(msg)
            }
        }
    }

    /// Stop waiting for `msg_ref`. Returns whether an entry existed.
    pub fn cancel(&self, msg_ref: &str) -> bool {
        self.pending.remove(msg_ref).is_some()
    }

    /// Drop every waiter; each sees a transport error.
    pub fn clear(&self) {
        self.pending.clear();
    }

    /// Number of registered waiters.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Handle to one awaited reply. Dropping it unregisters the ref.
#[derive(Debug)]
pub struct PendingReply {
    msg_ref: String,
    token: u64,
    rx: oneshot::Receiver<Message>,
    pending: Arc<PendingMap>,
}

impl PendingReply {
    /// Ref this handle waits on.
    pub fn msg_ref(&self) -> &str {
        &self.msg_ref
    }

    /// Wait for the reply. On timeout the registration is removed.
    pub async fn wait(mut self, timeout: Duration) -> Result<Message> {
        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(Ok(msg)) => Ok(msg),
            Ok(Err(_)) => Err(PhoenixError::Transport(format!(
                "reply channel closed (ref={})",
                self.msg_ref
            ))),
            Err(_) => Err(PhoenixError::Timeout),
        }
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        let token = self.token;
        self.pending
            .remove_if(&self.msg_ref, |_, waiter| waiter.token == token);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use serde_json::json;

    use super::*;

    fn phx_reply(msg_ref: &str) -> Message {
        Message::new()
            .with_topic("room:lobby")
            .with_event("phx_reply")
            .with_ref(msg_ref)
            .with_payload(json!({"status": "ok", "response": {}}))
    }

    #[test]
    fn refs_are_monotonic() {
        let refs = RefGenerator::new();
        assert_eq!(refs.next_ref(), "1");
        assert_eq!(refs.next_ref(), "2");
        assert_eq!(refs.next_ref(), "3");
    }

    #[tokio::test]
    async fn delivers_and_rewrites_event() {
        let registry = ReplyRegistry::new();
        let pending = registry.register("7");
        assert_eq!(registry.pending(), 1);

        assert!(matches!(registry.route(phx_reply("7")), Routed::Delivered));
        assert_eq!(registry.pending(), 0);

        let msg = pending.wait(Duration::from_secs(1)).await.unwrap();
        assert_eq!(msg.event(), Some("chan_reply_7"));
        assert!(msg.parse_reply().unwrap().unwrap().is_ok());
    }

    #[test]
    fn non_replies_and_unknown_refs_pass_through() {
        let registry = ReplyRegistry::new();
        let _pending = registry.register("1");

        let other = Message::new().with_event("new_msg").with_ref("1");
        assert!(matches!(registry.route(other), Routed::Unmatched(_)));

        assert!(matches!(registry.route(phx_reply("2")), Routed::Unmatched(_)));

        let no_ref = Message::new().with_event("phx_reply");
        assert!(matches!(registry.route(no_ref), Routed::Unmatched(_)));

        assert_eq!(registry.pending(), 1);
    }

    #[test]
    fn dropped_waiter_unregisters_and_reply_passes_unchanged() {
        let registry = ReplyRegistry::new();
        drop(registry.register("3"));
        assert_eq!(registry.pending(), 0);

        let Routed::Unmatched(msg) = registry.route(phx_reply("3")) else {
            panic!("waiter was dropped");
        };
        assert_eq!(msg.event(), Some("phx_reply"));
    }

    #[test]
    fn stale_handle_does_not_evict_reregistered_ref() {
        let registry = ReplyRegistry::new();
        let first = registry.register("5");
        let second = registry.register("5");
        drop(first);
        assert_eq!(registry.pending(), 1);

        drop(second);
        assert_eq!(registry.pending(), 0);
    }

    #[tokio::test]
    async fn timeout_removes_registration() {
        let registry = ReplyRegistry::new();
        let pending = registry.register("9");
        let err = pending.wait(Duration::from_millis(10)).await.expect_err("no reply");
        assert_eq!(err.code().as_str(), "TIMEOUT");
        assert_eq!(registry.pending(), 0);
    }

    #[tokio::test]
    async fn clear_fails_waiters() {
        let registry = ReplyRegistry::new();
        let pending = registry.register("4");
        registry.clear();
        let err = pending.wait(Duration::from_secs(1)).await.expect_err("cleared");
        assert_eq!(err.code().as_str(), "TRANSPORT");
        assert!(!registry.cancel("4"));
    }
}
