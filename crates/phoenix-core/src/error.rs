//! Shared error type across phoenix crates.

use thiserror::Error;

/// Stable error codes, used in logs and by callers that branch on failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Outbound system event outside the closed set.
    InvalidEvent,
    /// Inbound frame is not a well-formed five-element array.
    MalformedWireFormat,
    /// Reply payload has an unusable shape or status.
    MalformedReply,
    /// Operation attempted in the wrong state.
    InvalidState,
    /// Transport failure.
    Transport,
    /// Reply did not arrive in time.
    Timeout,
    /// Bad configuration.
    Config,
}

impl ErrorCode {
    /// String representation used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidEvent => "INVALID_EVENT",
            ErrorCode::MalformedWireFormat => "MALFORMED_WIRE_FORMAT",
            ErrorCode::MalformedReply => "MALFORMED_REPLY",
            ErrorCode::InvalidState => "INVALID_STATE",
            ErrorCode::Transport => "TRANSPORT",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Config => "CONFIG",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, PhoenixError>;

/// Unified error type used by core and client.
#[derive(Debug, Error)]
pub enum PhoenixError {
    #[error("invalid event: {0}")]
    InvalidEvent(String),
    #[error("malformed wire format: {0}")]
    MalformedWireFormat(String),
    #[error("malformed reply: {0}")]
    MalformedReply(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("transport: {0}")]
    Transport(String),
    #[error("timed out waiting for reply")]
    Timeout,
    #[error("config: {0}")]
    Config(String),
}

impl PhoenixError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            PhoenixError::InvalidEvent(_) => ErrorCode::InvalidEvent,
            PhoenixError::MalformedWireFormat(_) => ErrorCode::MalformedWireFormat,
            PhoenixError::MalformedReply(_) => ErrorCode::MalformedReply,
            PhoenixError::InvalidState(_) => ErrorCode::InvalidState,
            PhoenixError::Transport(_) => ErrorCode::Transport,
            PhoenixError::Timeout => ErrorCode::Timeout,
            PhoenixError::Config(_) => ErrorCode::Config,
        }
    }
}
