//! Error types for the agent tools

use ash_core::{ConfigError, DiscordError};
use thiserror::Error;

/// Result type for tool operations
pub type ToolsResult<T> = Result<T, ToolsError>;

/// Errors that can occur inside a tool before it is rendered as a response
#[derive(Error, Debug)]
pub enum ToolsError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Discord(#[from] DiscordError),

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// A third-party API answered with an error status
    #[error("{service} API error ({status}): {detail}")]
    Upstream {
        service: &'static str,
        status: u16,
        detail: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Caller input was rejected
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),
}

impl ToolsError {
    pub fn validation(message: impl Into<String>) -> Self {
        ToolsError::Validation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_names_service_and_status() {
        let err = ToolsError::Upstream {
            service: "ElevenLabs",
            status: 401,
            detail: "Invalid API key".into(),
        };
        assert_eq!(err.to_string(), "ElevenLabs API error (401): Invalid API key");
    }

    #[test]
    fn config_errors_keep_their_message() {
        let err: ToolsError = ConfigError::MissingEnvVar("TASKS_CHANNEL_ID".into()).into();
        assert_eq!(
            err.to_string(),
            "Missing required environment variable 'TASKS_CHANNEL_ID'"
        );
    }
}
