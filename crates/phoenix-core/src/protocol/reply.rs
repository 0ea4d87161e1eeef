//! Reply carried in the payload of `phx_reply` / `chan_reply_*` envelopes.
//!
//! Payload shape: `{"status": "ok" | "error" | "timeout", "response": {..}}`.
//! A missing status is tolerated and read as `error`; a status outside the
//! closed set is rejected as `MalformedReply`.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::{PhoenixError, Result};

/// Reply status (closed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyStatus {
    Ok,
    Error,
    Timeout,
}

impl ReplyStatus {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            ReplyStatus::Ok => "ok",
            ReplyStatus::Error => "error",
            ReplyStatus::Timeout => "timeout",
        }
    }
}

impl FromStr for ReplyStatus {
    type Err = PhoenixError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ok" => Ok(ReplyStatus::Ok),
            "error" => Ok(ReplyStatus::Error),
            "timeout" => Ok(ReplyStatus::Timeout),
            other => Err(PhoenixError::MalformedReply(format!(
                "unknown status: {other}"
            ))),
        }
    }
}

impl fmt::Display for ReplyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed reply. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    status: ReplyStatus,
    response: Map<String, Value>,
}

impl Reply {
    /// Reply with the given status and response body.
    pub fn new(status: ReplyStatus, response: Map<String, Value>) -> Self {
        Self { status, response }
    }

    /// Reply status.
    pub fn status(&self) -> ReplyStatus {
        self.status
    }

    /// Response body; empty when the server sent none.
    pub fn response(&self) -> &Map<String, Value> {
        &self.response
    }

    /// Whether the status is `ok`.
    pub fn is_ok(&self) -> bool {
        self.status == ReplyStatus::Ok
    }

    /// Interpret an envelope payload as a reply.
    pub fn from_payload(payload: Option<&Value>) -> Result<Reply> {
        let obj = match payload {
            None | Some(Value::Null) => {
                return Ok(Reply::new(ReplyStatus::Error, Map::new()));
            }
            Some(Value::Object(obj)) => obj,
            Some(other) => {
                return Err(PhoenixError::MalformedReply(format!(
                    "payload must be an object, got {}",
                    json_kind(other)
                )));
            }
        };

        // Absent status reads as error; garbage status is rejected.
        let status = match obj.get("status") {
            None | Some(Value::Null) => ReplyStatus::Error,
            Some(Value::String(s)) => s.parse()?,
            Some(other) => {
                return Err(PhoenixError::MalformedReply(format!(
                    "status must be a string, got {}",
                    json_kind(other)
                )));
            }
        };

        let response = match obj.get("response") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(m)) => m.clone(),
            Some(other) => {
                return Err(PhoenixError::MalformedReply(format!(
                    "response must be an object, got {}",
                    json_kind(other)
                )));
            }
        };

        Ok(Reply { status, response })
    }

    /// Render back to the payload shape `from_payload` reads.
    pub fn to_payload(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("status".into(), Value::String(self.status.as_str().into()));
        obj.insert("response".into(), Value::Object(self.response.clone()));
        Value::Object(obj)
    }
}

pub(crate) fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
