//! # Voice Messages
//!
//! Turns text into speech with ElevenLabs and posts the audio to Discord as
//! an `audio/mpeg` attachment.
//!
//! ## Environment Variables
//!
//! - `ELEVENLABS_API_KEY` - API key (required)
//! - `ELEVENLABS_VOICE_ID` - Default voice
//! - `ELEVENLABS_MODEL_ID` - Default model (default: `eleven_v3`)
//! - `ELEVENLABS_API_BASE` - API base URL (default: `https://api.elevenlabs.io/v1`)

use crate::error::{ToolsError, ToolsResult};
use ash_core::config::{ConfigResult, get_env_string, require_env};
use ash_core::tool::parse_input;
use ash_core::{Attachment, DiscordClient, DiscordConfig, DiscordError, Tool, ToolResponse};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const TOOL_NAME: &str = "send_voice_message";

pub const DEFAULT_API_BASE: &str = "https://api.elevenlabs.io/v1";
pub const DEFAULT_MODEL_ID: &str = "eleven_v3";

pub const MAX_TEXT_LENGTH: usize = 3000;
pub const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

const TTS_TIMEOUT: Duration = Duration::from_secs(300);
const UPLOAD_TIMEOUT_BASE_SECS: u64 = 60;
const UPLOAD_TIMEOUT_PER_MB_SECS: f64 = 10.0;
const UPLOAD_TIMEOUT_MAX_SECS: u64 = 300;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Strip NUL bytes and surrounding whitespace, then enforce length limits.
pub fn sanitize_text(text: &str) -> ToolsResult<String> {
    let sanitized = text.replace('\0', "").trim().to_string();
    if sanitized.is_empty() {
        return Err(ToolsError::validation("Text cannot be empty"));
    }
    let length = sanitized.chars().count();
    if length > MAX_TEXT_LENGTH {
        return Err(ToolsError::validation(format!(
            "Text too long ({length} chars). Maximum is {MAX_TEXT_LENGTH} characters."
        )));
    }
    Ok(sanitized)
}

/// Upload timeout grows with the file: 60s plus 10s per MB, capped at 300s.
pub fn upload_timeout(audio_bytes: usize) -> Duration {
    let extra = (audio_bytes as f64 / BYTES_PER_MB * UPLOAD_TIMEOUT_PER_MB_SECS) as u64;
    Duration::from_secs((UPLOAD_TIMEOUT_BASE_SECS + extra).min(UPLOAD_TIMEOUT_MAX_SECS))
}

/// ElevenLabs voice settings. Supplied values are clamped to `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_boost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_speaker_boost: Option<bool>,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: Some(0.5),
            similarity_boost: Some(0.75),
            style: Some(0.0),
            use_speaker_boost: Some(false),
        }
    }
}

impl VoiceSettings {
    /// Build from caller values; falls back to the defaults when none is set.
    pub fn from_parts(
        stability: Option<f64>,
        similarity_boost: Option<f64>,
        style: Option<f64>,
        use_speaker_boost: Option<bool>,
    ) -> Self {
        if stability.is_none()
            && similarity_boost.is_none()
            && style.is_none()
            && use_speaker_boost.is_none()
        {
            return Self::default();
        }
        let unit = |v: f64| v.clamp(0.0, 1.0);
        Self {
            stability: stability.map(unit),
            similarity_boost: similarity_boost.map(unit),
            style: style.map(unit),
            use_speaker_boost,
        }
    }
}

/// How to interpret the voice message target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceTarget {
    /// Try a DM with the id, fall back to treating it as a channel.
    #[default]
    Auto,
    User,
    Channel,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VoiceRequest {
    pub text: String,
    pub target: String,
    #[serde(default)]
    pub target_type: VoiceTarget,
    #[serde(default)]
    pub voice_id: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub stability: Option<f64>,
    #[serde(default)]
    pub similarity_boost: Option<f64>,
    #[serde(default)]
    pub style: Option<f64>,
    #[serde(default)]
    pub use_speaker_boost: Option<bool>,
    #[serde(default)]
    pub reply_to_message_id: Option<String>,
}

#[derive(Clone)]
pub struct VoiceConfig {
    pub discord: DiscordConfig,
    pub api_key: String,
    pub voice_id: Option<String>,
    pub model_id: String,
    pub api_base: String,
}

impl std::fmt::Debug for VoiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceConfig")
            .field("discord", &self.discord)
            .field("voice_id", &self.voice_id)
            .field("model_id", &self.model_id)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl VoiceConfig {
    pub fn new(discord: DiscordConfig, api_key: impl Into<String>) -> Self {
        Self {
            discord,
            api_key: api_key.into(),
            voice_id: None,
            model_id: DEFAULT_MODEL_ID.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_voice_id(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = Some(voice_id.into());
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn from_env() -> ConfigResult<Self> {
        let mut config = Self::new(DiscordConfig::from_env()?, require_env("ELEVENLABS_API_KEY")?);
        config.voice_id = get_env_string("ELEVENLABS_VOICE_ID");
        if let Some(model) = get_env_string("ELEVENLABS_MODEL_ID") {
            config.model_id = model;
        }
        if let Some(base) = get_env_string("ELEVENLABS_API_BASE") {
            config.api_base = base;
        }
        Ok(config)
    }
}

/// Phase of the pipeline, for timeout reporting.
#[derive(Debug, Clone, Copy)]
enum Phase {
    Synthesis,
    Upload,
}

fn timeout_message(phase: Phase, after: Duration) -> String {
    let source = match phase {
        Phase::Synthesis => "ElevenLabs TTS generation",
        Phase::Upload => "Discord upload",
    };
    format!(
        "Request timeout - {source} took longer than {} seconds. For very long messages, this may happen. Please try again or split the message into smaller parts.",
        after.as_secs()
    )
}

/// Pull a readable reason out of an ElevenLabs error body.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(parsed) => match parsed.get("detail") {
            Some(detail) => detail
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| parsed.to_string()),
            None => body.to_string(),
        },
        Err(_) => body.to_string(),
    }
}

/// Where the audio ended up being posted.
struct Destination {
    channel_id: String,
    is_dm: bool,
}

/// The `send_voice_message` tool.
pub struct VoiceTool {
    config: VoiceConfig,
    http: Client,
    discord: DiscordClient,
}

impl VoiceTool {
    pub fn new(config: VoiceConfig) -> Self {
        Self {
            discord: DiscordClient::new(&config.discord),
            http: Client::new(),
            config,
        }
    }

    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        model_id: &str,
        settings: &VoiceSettings,
    ) -> Result<Vec<u8>, String> {
        let response = self
            .http
            .post(format!("{}/text-to-speech/{voice_id}", self.config.api_base))
            .header("xi-api-key", &self.config.api_key)
            .json(&json!({
                "text": text,
                "model_id": model_id,
                "voice_settings": settings,
            }))
            .timeout(TTS_TIMEOUT)
            .send()
            .await
            .map_err(|e| request_failure(Phase::Synthesis, TTS_TIMEOUT, &e))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolsError::Upstream {
                service: "ElevenLabs",
                status: status.as_u16(),
                detail: error_detail(&body),
            }
            .to_string());
        }

        response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|e| request_failure(Phase::Synthesis, TTS_TIMEOUT, &e))
    }

    async fn resolve_destination(
        &self,
        target: &str,
        target_type: VoiceTarget,
    ) -> Result<Destination, String> {
        let direct = Destination {
            channel_id: target.to_string(),
            is_dm: false,
        };
        match target_type {
            VoiceTarget::Channel => Ok(direct),
            VoiceTarget::User => match self.discord.open_dm(target).await {
                Ok(channel_id) => Ok(Destination {
                    channel_id,
                    is_dm: true,
                }),
                Err(e) => Err(format!("Failed to create DM channel: {e}")),
            },
            VoiceTarget::Auto => match self.discord.open_dm(target).await {
                Ok(channel_id) => Ok(Destination {
                    channel_id,
                    is_dm: true,
                }),
                Err(e) => {
                    debug!(target, error = %e, "Target is not a DM recipient, posting to channel");
                    Ok(direct)
                }
            },
        }
    }

    /// Synthesize `request.text` and deliver it.
    pub async fn send(&self, request: VoiceRequest) -> ToolResponse {
        let text = match sanitize_text(&request.text) {
            Ok(text) => text,
            Err(e) => return ToolResponse::error(e.to_string()),
        };
        let Some(voice_id) = request.voice_id.clone().or_else(|| self.config.voice_id.clone()) else {
            return ToolResponse::error("No ElevenLabs voice configured");
        };
        let model_id = request
            .model_id
            .clone()
            .unwrap_or_else(|| self.config.model_id.clone());
        let settings = VoiceSettings::from_parts(
            request.stability,
            request.similarity_boost,
            request.style,
            request.use_speaker_boost,
        );

        info!(chars = text.chars().count(), %voice_id, "Generating voice message");
        let audio = match self.synthesize(&text, &voice_id, &model_id, &settings).await {
            Ok(audio) => audio,
            Err(message) => return ToolResponse::error(message),
        };

        let audio_mb = audio.len() as f64 / BYTES_PER_MB;
        if audio.len() > MAX_AUDIO_BYTES {
            return ToolResponse::error(format!(
                "Audio file too large ({audio_mb:.2}MB). Maximum is 25MB."
            ));
        }

        let destination = match self
            .resolve_destination(&request.target, request.target_type)
            .await
        {
            Ok(destination) => destination,
            Err(message) => return ToolResponse::error(message),
        };

        let timeout = upload_timeout(audio.len());
        info!(
            audio_bytes = audio.len(),
            timeout_secs = timeout.as_secs(),
            "Uploading voice message"
        );
        let attachment = Attachment {
            file_name: "voice_message.mp3".to_string(),
            mime_type: "audio/mpeg".to_string(),
            bytes: audio,
        };
        let sent = match self
            .discord
            .upload_file(
                &destination.channel_id,
                attachment,
                request.reply_to_message_id.as_deref(),
                timeout,
            )
            .await
        {
            Ok(message) => message,
            Err(e) if e.is_timeout() => {
                warn!("Voice upload timed out");
                return ToolResponse::error(timeout_message(Phase::Upload, timeout));
            }
            Err(DiscordError::Api { status, body }) => {
                return ToolResponse::error(format!(
                    "Failed to send Discord message ({status}): {body}"
                ));
            }
            Err(e) => return ToolResponse::error(e.to_string()),
        };

        let described = if destination.is_dm {
            format!("User {} (DM)", request.target)
        } else {
            format!("Channel {}", destination.channel_id)
        };

        ToolResponse::success(format!("Voice message sent to {described}"))
            .with_field("target", request.target.clone())
            .with_field("target_type", if destination.is_dm { "dm" } else { "channel" })
            .with_field("channel_id", destination.channel_id)
            .with_field("message_id", sent.id)
            .with_field("audio_size_kb", (audio_mb * 1024.0 * 100.0).round() / 100.0)
            .with_field("text_length", text.chars().count())
            .with_field("voice_id", voice_id)
            .with_field("model_id", model_id)
            .with_field("timestamp", sent.timestamp)
    }
}

fn request_failure(phase: Phase, timeout: Duration, error: &reqwest::Error) -> String {
    if error.is_timeout() {
        warn!(?phase, "Request timed out");
        timeout_message(phase, timeout)
    } else {
        format!("Network error: {error}")
    }
}

#[async_trait]
impl Tool for VoiceTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Send a spoken voice message to a Discord user or channel using ElevenLabs text-to-speech"
    }

    fn input_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "text": {"type": "string", "maxLength": MAX_TEXT_LENGTH},
                "target": {"type": "string"},
                "target_type": {"type": "string", "enum": ["auto", "user", "channel"]},
                "voice_id": {"type": "string"},
                "model_id": {"type": "string"},
                "stability": {"type": "number", "minimum": 0.0, "maximum": 1.0},
                "similarity_boost": {"type": "number", "minimum": 0.0, "maximum": 1.0},
                "style": {"type": "number", "minimum": 0.0, "maximum": 1.0},
                "use_speaker_boost": {"type": "boolean"},
                "reply_to_message_id": {"type": "string"}
            },
            "required": ["text", "target"]
        }))
    }

    async fn call(&self, input: Value) -> ToolResponse {
        match parse_input::<VoiceRequest>(input) {
            Ok(request) => self.send(request).await,
            Err(response) => response,
        }
    }
}
