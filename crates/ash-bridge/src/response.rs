//! Outcome of a dispatched command.

use crate::error::BridgeError;
use crate::frame::{Payload, ReplyFrame};
use ash_core::ToolResponse;
use serde_json::Value;
use std::time::Duration;

/// Terminal outcome of one command.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseResult {
    /// A success frame matched. The payload may be degraded to raw text.
    Success { payload: Payload },
    /// The command failed before dispatch, while sending, or the remote side
    /// answered with an error frame.
    Error { error: BridgeError },
    /// No reply arrived in time. The command may still be running remotely.
    Timeout { waited: Duration },
}

impl ResponseResult {
    pub fn error(error: BridgeError) -> Self {
        ResponseResult::Error { error }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResponseResult::Success { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ResponseResult::Timeout { .. })
    }

    /// The decoded payload, if the reply carried one.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            ResponseResult::Success {
                payload: Payload::Decoded(value),
            } => Some(value),
            _ => None,
        }
    }

    /// Render as the structured tool result callers see.
    ///
    /// Decoded payloads keep the remote `message` when there is one and are
    /// attached under `response`; degraded payloads are attached as
    /// `raw_response`.
    pub fn to_tool_response(&self) -> ToolResponse {
        match self {
            ResponseResult::Success {
                payload: Payload::Decoded(value),
            } => {
                let message = value
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("Command executed");
                ToolResponse::success(message).with_field("response", value.clone())
            }
            ResponseResult::Success {
                payload: Payload::Raw(raw),
            } => ToolResponse::success("Command executed").with_field("raw_response", raw.clone()),
            ResponseResult::Error { error } => ToolResponse::error(error.to_string()),
            ResponseResult::Timeout { waited } => ToolResponse::error(format!(
                "Timeout after {}s. The command may still be executing.",
                waited.as_secs()
            ))
            .with_field("timed_out", true),
        }
    }
}

impl From<ReplyFrame> for ResponseResult {
    fn from(reply: ReplyFrame) -> Self {
        match reply {
            ReplyFrame::Success(payload) => ResponseResult::Success { payload },
            ReplyFrame::Error(text) => ResponseResult::error(BridgeError::Remote(text)),
        }
    }
}
