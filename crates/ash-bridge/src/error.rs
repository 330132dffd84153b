//! Error types for bridge operations

use thiserror::Error;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors that can occur while resolving, sending or awaiting a command
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// Action name is not in the registry
    #[error("Unknown action: '{action}'. Available: {}", .available.join(", "))]
    ActionNotFound {
        action: String,
        available: Vec<&'static str>,
    },

    /// A recognized parameter carried a value that cannot be coerced
    #[error("Invalid value for '{parameter}' of action '{action}': {reason}")]
    InvalidParameter {
        action: String,
        parameter: String,
        reason: String,
    },

    /// Malformed caller input (empty sequence, step without action, ...)
    #[error("{0}")]
    Validation(String),

    /// The command frame could not be submitted
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Polling the channel failed; transient while the deadline has not passed
    #[error("Poll failed: {0}")]
    PollFailed(String),

    /// The remote side answered with an error frame; carries the frame text
    #[error("{0}")]
    Remote(String),

    /// Envelope serialization failed
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::SerializationFailed(err.to_string())
    }
}
