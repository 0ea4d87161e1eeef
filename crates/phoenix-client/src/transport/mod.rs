//! Transport layer (WebSocket contract).
//!
//! The core never talks to a socket directly. It produces and consumes text
//! (or UTF-8 binary) frames through the `Websocket` trait defined here. A
//! transport instance is configured once at construction; reconnecting means
//! building a new instance through a `WebsocketFactory`.

pub mod codec;
pub mod memory;

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use phoenix_core::error::{PhoenixError, Result};

use crate::config::SocketSettings;

pub use codec::{decode, encode, Frame};
pub use memory::{MemoryFactory, MemoryPeer, MemoryWebsocket};

/// Normal closure code.
pub const CLOSE_NORMAL: u16 = 1000;

/// Connection lifecycle. Linear: a transport never returns to `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebsocketState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl WebsocketState {
    fn as_u8(self) -> u8 {
        match self {
            WebsocketState::Connecting => 0,
            WebsocketState::Open => 1,
            WebsocketState::Closing => 2,
            WebsocketState::Closed => 3,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => WebsocketState::Connecting,
            1 => WebsocketState::Open,
            2 => WebsocketState::Closing,
            _ => WebsocketState::Closed,
        }
    }
}

/// Atomic holder for `WebsocketState`, shared by a transport and its reader task.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(WebsocketState::Connecting.as_u8()))
    }

    pub(crate) fn get(&self) -> WebsocketState {
        WebsocketState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move `from -> to`; false if the current state is not `from`.
    pub(crate) fn advance(&self, from: WebsocketState, to: WebsocketState) -> bool {
        self.0
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Enter `Closed`. Returns true only for the caller that performed the move.
    pub(crate) fn finish_close(&self) -> bool {
        self.0.swap(WebsocketState::Closed.as_u8(), Ordering::AcqRel)
            != WebsocketState::Closed.as_u8()
    }
}

pub type OnOpen = Arc<dyn Fn() + Send + Sync>;
pub type OnClose = Arc<dyn Fn(u16, String) + Send + Sync>;
pub type OnError = Arc<dyn Fn(PhoenixError) + Send + Sync>;
pub type OnMessage = Arc<dyn Fn(String) + Send + Sync>;
pub type OnBinary = Arc<dyn Fn(Bytes) + Send + Sync>;

/// Callbacks delivered to the transport owner. Exactly one of `on_message` /
/// `on_binary` fires per inbound frame.
#[derive(Clone)]
pub struct WebsocketCallbacks {
    pub on_open: OnOpen,
    pub on_close: OnClose,
    pub on_error: OnError,
    pub on_message: OnMessage,
    pub on_binary: OnBinary,
}

impl Default for WebsocketCallbacks {
    fn default() -> Self {
        Self {
            on_open: Arc::new(|| {}),
            on_close: Arc::new(|_, _| {}),
            on_error: Arc::new(|_| {}),
            on_message: Arc::new(|_| {}),
            on_binary: Arc::new(|_| {}),
        }
    }
}

impl WebsocketCallbacks {
    pub fn on_open(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_open = Arc::new(f);
        self
    }

    pub fn on_close(mut self, f: impl Fn(u16, String) + Send + Sync + 'static) -> Self {
        self.on_close = Arc::new(f);
        self
    }

    pub fn on_error(mut self, f: impl Fn(PhoenixError) + Send + Sync + 'static) -> Self {
        self.on_error = Arc::new(f);
        self
    }

    pub fn on_message(mut self, f: impl Fn(String) + Send + Sync + 'static) -> Self {
        self.on_message = Arc::new(f);
        self
    }

    pub fn on_binary(mut self, f: impl Fn(Bytes) + Send + Sync + 'static) -> Self {
        self.on_binary = Arc::new(f);
        self
    }
}

impl fmt::Debug for WebsocketCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebsocketCallbacks").finish_non_exhaustive()
    }
}

/// Construction-time transport configuration (fixed for the instance).
#[derive(Debug, Clone)]
pub struct WebsocketConfig {
    pub endpoint: String,
    pub binary_mode: bool,
    pub callbacks: WebsocketCallbacks,
}

impl WebsocketConfig {
    pub fn new(settings: &SocketSettings, callbacks: WebsocketCallbacks) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            binary_mode: settings.binary_mode,
            callbacks,
        }
    }
}

/// A persistent bidirectional connection.
#[async_trait]
pub trait Websocket: Send + Sync {
    fn state(&self) -> WebsocketState;

    fn binary_mode(&self) -> bool;

    async fn connect(&self) -> Result<()>;

    async fn send_text(&self, data: String) -> Result<()>;

    async fn send_binary(&self, data: Bytes) -> Result<()>;

    /// Close with an optional code (default 1000) and reason.
    async fn close(&self, code: Option<u16>, reason: Option<String>) -> Result<()>;
}

/// Builds transports; one instance per connection attempt.
pub trait WebsocketFactory: Send + Sync {
    fn build(&self, config: WebsocketConfig) -> Box<dyn Websocket>;
}
