//! Command framing and reply classification.
//!
//! This is the only place that knows how commands and replies are encoded
//! as chat text:
//!
//! - outbound: `🤖 MCP_COMMAND [<request_id>]: ` + fenced JSON envelope
//! - success:  text containing `MCP_RESPONSE [<request_id>]`, result payload
//!   in the first fenced JSON block
//! - error:    text containing `MCP_ERROR [<request_id>]`, free-form

use ash_core::fenced::{decode_json_block, render_json_block};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicI64, Ordering};

const COMMAND_TYPE: &str = "mcp_command";

/// Correlation token shared by a command frame and its reply.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Wrap an existing id, e.g. one read back from a frame.
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh id from the process-wide generator.
    pub fn generate() -> Self {
        static GENERATOR: CorrelationIdGenerator = CorrelationIdGenerator::new();
        GENERATOR.next()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn command_marker(&self) -> String {
        format!("MCP_COMMAND [{}]", self.0)
    }

    pub fn response_marker(&self) -> String {
        format!("MCP_RESPONSE [{}]", self.0)
    }

    pub fn error_marker(&self) -> String {
        format!("MCP_ERROR [{}]", self.0)
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Millisecond-timestamp ids (`mcp_<unix millis>`), strictly increasing.
///
/// When two ids are requested within the same millisecond the second one is
/// bumped past the first, so ids never repeat within one generator.
#[derive(Debug, Default)]
pub struct CorrelationIdGenerator {
    last_millis: AtomicI64,
}

impl CorrelationIdGenerator {
    pub const fn new() -> Self {
        Self {
            last_millis: AtomicI64::new(0),
        }
    }

    pub fn next(&self) -> CorrelationId {
        self.next_at(Utc::now().timestamp_millis())
    }

    fn next_at(&self, now_millis: i64) -> CorrelationId {
        let mut last = self.last_millis.load(Ordering::Relaxed);
        loop {
            let candidate = now_millis.max(last + 1);
            match self.last_millis.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return CorrelationId(format!("mcp_{candidate}")),
                Err(current) => last = current,
            }
        }
    }
}

/// Command as serialized into the outbound frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub tool: String,
    pub arguments: Map<String, Value>,
    /// Seconds since the Unix epoch, fractional.
    pub timestamp: f64,
    pub request_id: CorrelationId,
}

impl CommandEnvelope {
    pub fn new(capability_id: impl Into<String>, arguments: Map<String, Value>, request_id: CorrelationId) -> Self {
        let now = Utc::now();
        Self {
            kind: COMMAND_TYPE.to_string(),
            tool: capability_id.into(),
            arguments,
            timestamp: now.timestamp_micros() as f64 / 1_000_000.0,
            request_id,
        }
    }

    /// Render the frame text posted to the channel.
    pub fn to_frame_text(&self) -> Result<String, serde_json::Error> {
        let body = serde_json::to_value(self)?;
        Ok(format!(
            "🤖 {}: {}",
            self.request_id.command_marker(),
            render_json_block(&body)
        ))
    }
}

/// Result payload of a matched success frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The fenced JSON block decoded cleanly.
    Decoded(Value),
    /// The frame matched but carried no decodable block; the raw text is kept.
    Raw(String),
}

/// A frame recognized as the reply to a specific command.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyFrame {
    Success(Payload),
    Error(String),
}

/// Classify `text` as a reply to `request_id`.
///
/// Returns `None` for unrelated traffic, including replies to other
/// requests. Success markers take precedence over error markers. Pure, so
/// seeing the same frame twice yields the same answer.
pub fn classify_reply(text: &str, request_id: &CorrelationId) -> Option<ReplyFrame> {
    if text.contains(&request_id.response_marker()) {
        let payload = match decode_json_block(text) {
            Some(Ok(value)) => Payload::Decoded(value),
            Some(Err(_)) | None => Payload::Raw(text.to_string()),
        };
        return Some(ReplyFrame::Success(payload));
    }
    if text.contains(&request_id.error_marker()) {
        return Some(ReplyFrame::Error(text.to_string()));
    }
    None
}
