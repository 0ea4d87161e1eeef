//! In-process transport.
//!
//! `MemoryWebsocket` talks to a `MemoryPeer` over tokio channels. The peer
//! plays the server side in tests and local tooling. Inbound frames are
//! delivered by a reader task, so a slow consumer never blocks the send path.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use phoenix_core::error::{PhoenixError, Result};

use super::{
    Frame, StateCell, Websocket, WebsocketCallbacks, WebsocketConfig, WebsocketFactory,
    WebsocketState, CLOSE_NORMAL,
};

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug)]
enum PeerEvent {
    Frame(Frame),
    Close { code: u16, reason: String },
}

/// Client side of an in-memory connection.
pub struct MemoryWebsocket {
    config: WebsocketConfig,
    state: Arc<StateCell>,
    to_peer: Mutex<Option<mpsc::Sender<Frame>>>,
    from_peer: Mutex<Option<mpsc::Receiver<PeerEvent>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

/// Server side of an in-memory connection.
#[derive(Debug)]
pub struct MemoryPeer {
    tx: mpsc::Sender<PeerEvent>,
    rx: mpsc::Receiver<Frame>,
}

impl MemoryWebsocket {
    /// Build a connected-to-nothing transport and the peer that drives it.
    pub fn pair(config: WebsocketConfig) -> (MemoryWebsocket, MemoryPeer) {
        let (to_peer_tx, to_peer_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (from_peer_tx, from_peer_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let ws = MemoryWebsocket {
            config,
            state: Arc::new(StateCell::new()),
            to_peer: Mutex::new(Some(to_peer_tx)),
            from_peer: Mutex::new(Some(from_peer_rx)),
            reader: Mutex::new(None),
        };
        let peer = MemoryPeer {
            tx: from_peer_tx,
            rx: to_peer_rx,
        };
        (ws, peer)
    }

    /// Endpoint from the construction config.
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    async fn send_frame(&self, frame: Frame) -> Result<()> {
        if self.state.get() != WebsocketState::Open {
            return Err(PhoenixError::InvalidState(format!(
                "send on {:?} transport",
                self.state.get()
            )));
        }
        let tx = self
            .to_peer
            .lock()
            .await
            .clone()
            .ok_or_else(|| PhoenixError::Transport("outbound channel closed".into()))?;
        tracing::trace!(len = frame.len(), "frame out");
        tx.send(frame)
            .await
            .map_err(|_| PhoenixError::Transport("peer gone".into()))
    }
}

async fn read_loop(
    mut rx: mpsc::Receiver<PeerEvent>,
    callbacks: WebsocketCallbacks,
    state: Arc<StateCell>,
) {
    while let Some(ev) = rx.recv().await {
        match ev {
            PeerEvent::Frame(Frame::Text(s)) => (callbacks.on_message)(s),
            PeerEvent::Frame(Frame::Binary(b)) => (callbacks.on_binary)(b),
            PeerEvent::Close { code, reason } => {
                if state.finish_close() {
                    (callbacks.on_close)(code, reason);
                }
                return;
            }
        }
    }

    // Peer dropped without a close frame.
    if state.finish_close() {
        (callbacks.on_close)(CLOSE_NORMAL, "peer closed".into());
    }
}

#[async_trait]
impl Websocket for MemoryWebsocket {
    fn state(&self) -> WebsocketState {
        self.state.get()
    }

    fn binary_mode(&self) -> bool {
        self.config.binary_mode
    }

    async fn connect(&self) -> Result<()> {
        let rx = self
            .from_peer
            .lock()
            .await
            .take()
            .ok_or_else(|| PhoenixError::InvalidState("transport already connected".into()))?;

        if !self.state.advance(WebsocketState::Connecting, WebsocketState::Open) {
            return Err(PhoenixError::InvalidState(format!(
                "connect on {:?} transport",
                self.state.get()
            )));
        }
        tracing::debug!(endpoint = %self.config.endpoint, "memory transport open");
        (self.config.callbacks.on_open)();

        let handle = tokio::spawn(read_loop(
            rx,
            self.config.callbacks.clone(),
            self.state.clone(),
        ));
        *self.reader.lock().await = Some(handle);
        Ok(())
    }

    async fn send_text(&self, data: String) -> Result<()> {
        self.send_frame(Frame::Text(data)).await
    }

    async fn send_binary(&self, data: Bytes) -> Result<()> {
        self.send_frame(Frame::Binary(data)).await
    }

    async fn close(&self, code: Option<u16>, reason: Option<String>) -> Result<()> {
        let was_open = self.state.advance(WebsocketState::Open, WebsocketState::Closing);
        if !was_open && self.state.get() != WebsocketState::Connecting {
            // Already closing or closed.
            return Ok(());
        }

        self.to_peer.lock().await.take();
        if let Some(handle) = self.reader.lock().await.take() {
            handle.abort();
        }

        if self.state.finish_close() {
            (self.config.callbacks.on_close)(
                code.unwrap_or(CLOSE_NORMAL),
                reason.unwrap_or_default(),
            );
        }
        Ok(())
    }
}

impl Drop for MemoryWebsocket {
    fn drop(&mut self) {
        if let Some(handle) = self.reader.get_mut().take() {
            handle.abort();
        }
    }
}

impl MemoryPeer {
    /// Send a text frame to the client.
    pub async fn send_text(&self, data: impl Into<String>) -> Result<()> {
        self.send(Frame::Text(data.into())).await
    }

    /// Send a binary frame to the client.
    pub async fn send_binary(&self, data: impl Into<Bytes>) -> Result<()> {
        self.send(Frame::Binary(data.into())).await
    }

    /// Send one frame to the client; fails once the client is dropped.
    pub async fn send(&self, frame: Frame) -> Result<()> {
        self.tx
            .send(PeerEvent::Frame(frame))
            .await
            .map_err(|_| PhoenixError::Transport("client gone".into()))
    }

    /// Next frame sent by the client; `None` once the client has closed.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    /// Close from the server side.
    pub async fn close(self, code: u16, reason: impl Into<String>) -> Result<()> {
        self.tx
            .send(PeerEvent::Close {
                code,
                reason: reason.into(),
            })
            .await
            .map_err(|_| PhoenixError::Transport("client gone".into()))
    }
}

/// Factory handing out the peer of every transport it builds.
pub struct MemoryFactory {
    peers: mpsc::UnboundedSender<MemoryPeer>,
}

impl MemoryFactory {
    /// Factory plus the receiver its peers are handed to.
    pub fn channel() -> (MemoryFactory, mpsc::UnboundedReceiver<MemoryPeer>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (MemoryFactory { peers: tx }, rx)
    }
}

impl WebsocketFactory for MemoryFactory {
    fn build(&self, config: WebsocketConfig) -> Box<dyn Websocket> {
        let (ws, peer) = MemoryWebsocket::pair(config);
        if self.peers.send(peer).is_err() {
            tracing::warn!("memory factory peer receiver dropped");
        }
        Box::new(ws)
    }
}
