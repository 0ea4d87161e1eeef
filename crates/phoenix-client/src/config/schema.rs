use std::time::Duration;

use phoenix_core::error::{PhoenixError, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub version: u32,

    #[serde(default)]
    pub socket: SocketSettings,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(PhoenixError::Config(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.socket.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SocketSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Send frames as binary instead of text.
    #[serde(default)]
    pub binary_mode: bool,

    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,

    /// Capacity of the queue handing non-reply messages to the application.
    #[serde(default = "default_inbound_buffer")]
    pub inbound_buffer: usize,
}

impl Default for SocketSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            binary_mode: false,
            reply_timeout_ms: default_reply_timeout_ms(),
            inbound_buffer: default_inbound_buffer(),
        }
    }
}

impl SocketSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.endpoint.starts_with("ws://") || self.endpoint.starts_with("wss://")) {
            return Err(PhoenixError::Config(
                "socket.endpoint must start with ws:// or wss://".into(),
            ));
        }
        if !(100..=300000).contains(&self.reply_timeout_ms) {
            return Err(PhoenixError::Config(
                "socket.reply_timeout_ms must be between 100 and 300000".into(),
            ));
        }
        if !(1..=65536).contains(&self.inbound_buffer) {
            return Err(PhoenixError::Config(
                "socket.inbound_buffer must be between 1 and 65536".into(),
            ));
        }
        Ok(())
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }
}

fn default_endpoint() -> String {
    "ws://localhost:4000/socket/websocket".into()
}
fn default_reply_timeout_ms() -> u64 {
    10000
}
fn default_inbound_buffer() -> usize {
    256
}
