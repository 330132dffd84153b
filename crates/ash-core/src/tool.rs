//! Tool trait and the structured response every tool returns.
//!
//! Tools never surface expected failures (unknown action, timeout, remote
//! error) as `Err` or panics. Every outcome is a [`ToolResponse`] carrying an
//! explicit [`ToolStatus`], a human-readable message and tool-specific fields.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome class of a tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    /// Everything the tool attempted succeeded.
    Success,
    /// A batch ran to completion but some items failed.
    Partial,
    /// The tool could not do what was asked.
    Error,
}

impl ToolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolStatus::Success => "success",
            ToolStatus::Partial => "partial",
            ToolStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured result of a tool invocation.
///
/// Serializes to a flat JSON object: `{"status": .., "message": .., ...details}`.
///
/// # Example
///
/// ```rust
/// use ash_core::tool::{ToolResponse, ToolStatus};
///
/// let response = ToolResponse::success("Heartbeat sent")
///     .with_field("channel_id", "123");
///
/// assert_eq!(response.status, ToolStatus::Success);
/// assert_eq!(response.field("channel_id").and_then(|v| v.as_str()), Some("123"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub status: ToolStatus,
    pub message: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl ToolResponse {
    pub fn new(status: ToolStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: Map::new(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(ToolStatus::Success, message)
    }

    pub fn partial(message: impl Into<String>) -> Self {
        Self::new(ToolStatus::Partial, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ToolStatus::Error, message)
    }

    /// Attach a tool-specific field. `status` and `message` are reserved and
    /// silently dropped so the envelope stays consistent.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        if key == "status" || key == "message" {
            return;
        }
        self.details.insert(key, value.into());
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == ToolStatus::Error
    }

    pub fn to_value(&self) -> Value {
        let mut object = Map::with_capacity(self.details.len() + 2);
        object.insert("status".into(), Value::from(self.status.as_str()));
        object.insert("message".into(), Value::from(self.message.clone()));
        for (key, value) in &self.details {
            object.insert(key.clone(), value.clone());
        }
        Value::Object(object)
    }
}

/// An agent-invokable tool.
///
/// Tools take a JSON object of arguments (the shape an agent tool call
/// delivers) and always answer with a [`ToolResponse`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name used for registry lookup.
    fn name(&self) -> &str;

    /// Human-readable description for tool listings.
    fn description(&self) -> &str {
        ""
    }

    /// JSON Schema of the accepted arguments, if the tool publishes one.
    fn input_schema(&self) -> Option<Value> {
        None
    }

    /// Execute the tool.
    async fn call(&self, input: Value) -> ToolResponse;
}

/// Deserialize tool arguments, mapping failures to an error response.
pub fn parse_input<T: serde::de::DeserializeOwned>(input: Value) -> Result<T, ToolResponse> {
    serde_json::from_value(input).map_err(|e| ToolResponse::error(format!("Invalid input: {e}")))
}
