//! Session: one transport + codec + reply registry.
//!
//! Responsibilities:
//! - Build the transport with callbacks that decode inbound frames
//! - Route replies to their waiters, forward everything else to the app
//! - Drop malformed frames with a warning (the connection stays up)
//! - Allocate refs for outbound pushes
//!
//! Channel join/leave state and heartbeats are layered on top of this.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use phoenix_core::error::{PhoenixError, Result};
use phoenix_core::{JsonSerializer, Message, MessageSerializer, Reply};

use crate::config::SocketSettings;
use crate::correlation::{PendingReply, RefGenerator, ReplyRegistry, Routed};
use crate::transport::{
    codec, Frame, Websocket, WebsocketCallbacks, WebsocketConfig, WebsocketFactory, WebsocketState,
};

/// A connected transport with reply correlation on top.
pub struct Session {
    socket: Box<dyn Websocket>,
    serializer: Arc<dyn MessageSerializer>,
    registry: ReplyRegistry,
    refs: RefGenerator,
    settings: SocketSettings,
}

/// Inbound path shared by the text and binary callbacks.
struct InboundSink {
    serializer: Arc<dyn MessageSerializer>,
    registry: ReplyRegistry,
    tx: mpsc::Sender<Message>,
}

impl InboundSink {
    fn accept(&self, frame: Frame) {
        let msg = match codec::decode(self.serializer.as_ref(), &frame) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(
                    code = e.code().as_str(),
                    error = %e,
                    len = frame.len(),
                    "dropping malformed frame"
                );
                return;
            }
        };

        match self.registry.route(msg) {
            Routed::Delivered => {}
            Routed::Unmatched(msg) => {
                tracing::debug!(topic = ?msg.topic(), event = ?msg.event(), "inbound message");
                if let Err(e) = self.tx.try_send(msg) {
                    tracing::warn!(error = %e, "inbound queue full or closed; message dropped");
                }
            }
        }
    }
}

impl Session {
    /// Connect with the default JSON serializer.
    pub async fn connect(
        factory: &dyn WebsocketFactory,
        settings: SocketSettings,
    ) -> Result<(Session, mpsc::Receiver<Message>)> {
        Self::connect_with(factory, settings, Arc::new(JsonSerializer::new())).await
    }

    /// Connect with a caller-supplied serializer.
    pub async fn connect_with(
        factory: &dyn WebsocketFactory,
        settings: SocketSettings,
        serializer: Arc<dyn MessageSerializer>,
    ) -> Result<(Session, mpsc::Receiver<Message>)> {
        settings.validate()?;

        let registry = ReplyRegistry::new();
        let (tx, rx) = mpsc::channel(settings.inbound_buffer);
        let sink = Arc::new(InboundSink {
            serializer: serializer.clone(),
            registry: registry.clone(),
            tx,
        });

        let text_sink = sink.clone();
        let binary_sink = sink;
        let close_registry = registry.clone();
        let endpoint = settings.endpoint.clone();

        let callbacks = WebsocketCallbacks::default()
            .on_open(move || tracing::info!(endpoint = %endpoint, "socket open"))
            .on_close(move |code, reason| {
                tracing::info!(code, reason = %reason, "socket closed");
                close_registry.clear();
            })
            .on_error(|e| tracing::warn!(code = e.code().as_str(), error = %e, "socket error"))
            .on_message(move |s| text_sink.accept(Frame::Text(s)))
            .on_binary(move |b| binary_sink.accept(Frame::Binary(b)));

        let socket = factory.build(WebsocketConfig::new(&settings, callbacks));
        socket.connect().await?;

        let session = Session {
            socket,
            serializer,
            registry,
            refs: RefGenerator::new(),
            settings,
        };
        Ok((session, rx))
    }

    /// Transport state.
    pub fn state(&self) -> WebsocketState {
        self.socket.state()
    }

    /// Settings the session was built with.
    pub fn settings(&self) -> &SocketSettings {
        &self.settings
    }

    /// Number of pushes still waiting for a reply.
    pub fn pending_replies(&self) -> usize {
        self.registry.pending()
    }

    /// Send a message as-is, without reply tracking.
    pub async fn send(&self, msg: &Message) -> Result<()> {
        let frame = codec::encode(self.serializer.as_ref(), msg, self.socket.binary_mode())?;
        tracing::trace!(%msg, "send");
        match frame {
            Frame::Text(s) => self.socket.send_text(s).await,
            Frame::Binary(b) => self.socket.send_binary(b).await,
        }
    }

    /// Send an event under a fresh ref and register for its reply.
    pub async fn push(
        &self,
        topic: &str,
        event: &str,
        payload: Value,
        join_ref: Option<&str>,
    ) -> Result<PendingReply> {
        let msg_ref = self.refs.next_ref();
        let mut msg = Message::new()
            .with_topic(topic)
            .with_event(event)
            .with_payload(payload)
            .with_ref(msg_ref.clone());
        if let Some(j) = join_ref {
            msg = msg.with_join_ref(j);
        }

        let pending = self.registry.register(msg_ref.clone());
        if let Err(e) = self.send(&msg).await {
            self.registry.cancel(&msg_ref);
            return Err(e);
        }
        tracing::debug!(topic, event, msg_ref = %msg_ref, "push");
        Ok(pending)
    }

    /// Push and wait for the parsed reply, bounded by `reply_timeout_ms`.
    pub async fn request(
        &self,
        topic: &str,
        event: &str,
        payload: Value,
        join_ref: Option<&str>,
    ) -> Result<Reply> {
        let pending = self.push(topic, event, payload, join_ref).await?;
        let msg = pending.wait(self.settings.reply_timeout()).await?;
        msg.parse_reply()?
            .cloned()
            .ok_or_else(|| PhoenixError::InvalidState(format!("routed non-reply message: {msg}")))
    }

    /// Close the transport and fail every pending reply.
    pub async fn close(&self) -> Result<()> {
        self.registry.clear();
        self.socket.close(None, None).await
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.registry.clear();
    }
}
