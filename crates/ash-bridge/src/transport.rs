//! Channel transport: the shared, append-only message channel the protocol
//! rides on.
//!
//! The protocol needs exactly two operations from it: append a frame, and
//! list frames that arrived after a known frame. Anything that can do that
//! (a Discord channel, an in-memory log in tests) can carry commands.

use crate::error::{BridgeError, BridgeResult};
use ash_core::{DiscordClient, DiscordConfig};
use async_trait::async_trait;
use std::sync::Arc;

/// Position of a frame within the channel (a message id).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FramePosition(String);

impl FramePosition {
    pub fn new(position: impl Into<String>) -> Self {
        Self(position.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FramePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One unit of text on the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub position: FramePosition,
    pub text: String,
}

/// Core trait for the channel the protocol runs over.
///
/// # Example
///
/// ```rust,no_run
/// use ash_bridge::{ChannelTransport, FramePosition};
///
/// async fn example(channel: impl ChannelTransport) -> Result<(), Box<dyn std::error::Error>> {
///     let sent = channel.send("hello").await?;
///     let newer = channel.list_after(&sent, 10).await?;
///     println!("{} frames after {}", newer.len(), sent);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    /// Append a frame and return its position.
    ///
    /// Single attempt, not idempotent.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::SendFailed` on network or API failure.
    async fn send(&self, text: &str) -> BridgeResult<FramePosition>;

    /// List up to `limit` frames strictly after `position`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::PollFailed` on network or API failure.
    async fn list_after(&self, position: &FramePosition, limit: usize) -> BridgeResult<Vec<Frame>>;
}

#[async_trait]
impl<T: ChannelTransport + ?Sized> ChannelTransport for Arc<T> {
    async fn send(&self, text: &str) -> BridgeResult<FramePosition> {
        (**self).send(text).await
    }

    async fn list_after(&self, position: &FramePosition, limit: usize) -> BridgeResult<Vec<Frame>> {
        (**self).list_after(position, limit).await
    }
}

/// A Discord text channel used as the command bus.
#[derive(Clone)]
pub struct DiscordChannel {
    client: DiscordClient,
    channel_id: String,
}

impl DiscordChannel {
    pub fn new(client: DiscordClient, channel_id: impl Into<String>) -> Self {
        Self {
            client,
            channel_id: channel_id.into(),
        }
    }

    pub fn from_config(config: &DiscordConfig, channel_id: impl Into<String>) -> Self {
        Self::new(DiscordClient::new(config), channel_id)
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }
}

#[async_trait]
impl ChannelTransport for DiscordChannel {
    async fn send(&self, text: &str) -> BridgeResult<FramePosition> {
        let message = self
            .client
            .create_message(&self.channel_id, text)
            .await
            .map_err(|e| BridgeError::SendFailed(e.to_string()))?;
        Ok(FramePosition::new(message.id))
    }

    async fn list_after(&self, position: &FramePosition, limit: usize) -> BridgeResult<Vec<Frame>> {
        let messages = self
            .client
            .list_messages(&self.channel_id, Some(position.as_str()), limit)
            .await
            .map_err(|e| BridgeError::PollFailed(e.to_string()))?;
        Ok(messages
            .into_iter()
            .map(|message| Frame {
                position: FramePosition::new(message.id),
                text: message.content,
            })
            .collect())
    }
}
