//! # Discord REST Client
//!
//! Thin client over the handful of Discord REST v10 endpoints the tools use:
//! posting and listing channel messages, opening DM channels and uploading
//! file attachments. Every request carries `Authorization: Bot <token>`.

use crate::config::DiscordConfig;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Default per-request timeout for message and DM calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Discord caps `limit` on message listings at 100.
const MAX_PAGE_SIZE: usize = 100;

pub type DiscordResult<T> = Result<T, DiscordError>;

/// Errors that can occur while talking to Discord
#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    /// Transport-level failure (DNS, TLS, connection reset, timeout)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Discord answered with an unexpected status code
    #[error("Discord API Error: {status} - {body}")]
    Api { status: u16, body: String },

    /// Discord answered successfully but the body was not what we expected
    #[error("Unexpected Discord response: {0}")]
    Decode(String),
}

impl DiscordError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, DiscordError::Network(e) if e.is_timeout())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            DiscordError::Api { status, .. } => Some(*status),
            DiscordError::Network(e) => e.status().map(|s| s.as_u16()),
            DiscordError::Decode(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub bot: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordMessage {
    pub id: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub author: Option<DiscordUser>,
}

impl DiscordMessage {
    /// Snowflake ids grow with creation time.
    pub fn snowflake(&self) -> Option<u64> {
        self.id.parse().ok()
    }
}

#[derive(Debug, Deserialize)]
struct DiscordChannel {
    id: String,
}

/// A file to attach to a message.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Discord REST client bound to one bot token.
#[derive(Clone)]
pub struct DiscordClient {
    http: Client,
    api_base: String,
    token: String,
    request_timeout: Duration,
}

impl DiscordClient {
    pub fn new(config: &DiscordConfig) -> Self {
        Self::with_http_client(config, Client::new())
    }

    pub fn with_http_client(config: &DiscordConfig, http: Client) -> Self {
        Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.bot_token.clone(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("Authorization", format!("Bot {}", self.token))
    }

    /// Post a text message to a channel.
    pub async fn create_message(&self, channel_id: &str, content: &str) -> DiscordResult<DiscordMessage> {
        debug!(channel_id, len = content.len(), "posting Discord message");
        let request = self
            .http
            .post(self.url(&format!("/channels/{channel_id}/messages")))
            .json(&json!({ "content": content }))
            .timeout(self.request_timeout);
        let response = self.authorized(request).send().await?;
        decode(expect_status(response, &[StatusCode::OK, StatusCode::CREATED]).await?).await
    }

    /// List up to `limit` messages of a channel, optionally only those
    /// created after the message `after`.
    ///
    /// Messages are returned oldest first regardless of the order Discord
    /// delivers them in.
    pub async fn list_messages(
        &self,
        channel_id: &str,
        after: Option<&str>,
        limit: usize,
    ) -> DiscordResult<Vec<DiscordMessage>> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE).to_string();
        let mut query = vec![("limit", limit.as_str())];
        if let Some(after) = after {
            query.push(("after", after));
        }
        let request = self
            .http
            .get(self.url(&format!("/channels/{channel_id}/messages")))
            .query(&query)
            .timeout(self.request_timeout);
        let response = self.authorized(request).send().await?;
        let mut messages: Vec<DiscordMessage> =
            decode(expect_status(response, &[StatusCode::OK]).await?).await?;
        sort_oldest_first(&mut messages);
        Ok(messages)
    }

    /// Open (or fetch) the DM channel with a user and return its id.
    pub async fn open_dm(&self, recipient_id: &str) -> DiscordResult<String> {
        debug!(recipient_id, "opening DM channel");
        let request = self
            .http
            .post(self.url("/users/@me/channels"))
            .json(&json!({ "recipient_id": recipient_id }))
            .timeout(self.request_timeout);
        let response = self.authorized(request).send().await?;
        let channel: DiscordChannel = decode(expect_status(response, &[StatusCode::OK]).await?).await?;
        Ok(channel.id)
    }

    /// Upload a file as a new message, optionally replying to another message.
    pub async fn upload_file(
        &self,
        channel_id: &str,
        attachment: Attachment,
        reply_to: Option<&str>,
        timeout: Duration,
    ) -> DiscordResult<DiscordMessage> {
        debug!(
            channel_id,
            file = %attachment.file_name,
            bytes = attachment.bytes.len(),
            "uploading attachment"
        );
        let part = reqwest::multipart::Part::bytes(attachment.bytes)
            .file_name(attachment.file_name)
            .mime_str(&attachment.mime_type)?;
        let mut form = reqwest::multipart::Form::new().part("file", part);
        if let Some(message_id) = reply_to {
            let payload = json!({ "message_reference": { "message_id": message_id } });
            form = form.text("payload_json", payload.to_string());
        }
        let request = self
            .http
            .post(self.url(&format!("/channels/{channel_id}/messages")))
            .multipart(form)
            .timeout(timeout);
        let response = self.authorized(request).send().await?;
        decode(expect_status(response, &[StatusCode::OK, StatusCode::CREATED]).await?).await
    }
}

fn sort_oldest_first(messages: &mut [DiscordMessage]) {
    messages.sort_by_key(|m| (m.snowflake().unwrap_or(u64::MAX), m.id.clone()));
}

async fn expect_status(response: Response, accepted: &[StatusCode]) -> DiscordResult<Response> {
    let status = response.status();
    if accepted.contains(&status) {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(DiscordError::Api {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> DiscordResult<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| DiscordError::Decode(e.to_string()))
}
