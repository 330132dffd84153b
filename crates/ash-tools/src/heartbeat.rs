//! # Heartbeat
//!
//! An irregular, self-authored pulse: a short tagged message with an
//! emotional temperature, a rhythm, optional ambient context and an
//! optional whisper, sent to a user's DM or a channel.
//!
//! ## Environment Variables
//!
//! - `DEFAULT_USER_ID` - Recipient when no target is given (falls back to `ALLOWED_DM_USER_ID`)
//! - `BOT_LANGUAGE` - `de` for German labels, anything else for English
//! - `TIMEZONE` - IANA zone name for the context timestamp (default: `Europe/Berlin`)
//! - `SPOTIFY_*`, `WEATHER_*` - see [`crate::context`]

use crate::context::{NowPlaying, SpotifyClient, SpotifyConfig, Weather, WeatherClient, WeatherConfig};
use ash_core::config::{ConfigError, ConfigResult, get_env_string};
use ash_core::tool::parse_input;
use ash_core::{DiscordClient, DiscordConfig, Tool, ToolResponse};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

pub const TOOL_NAME: &str = "send_heartbeat";

/// Emoji for a temperature tag; unknown tags get a purple heart.
pub fn temperature_emoji(temperature: &str) -> &'static str {
    match temperature {
        "warm" => "🔥",
        "scorching" => "🌡️",
        "tender" => "🌸",
        "race" => "💓",
        "stutter" => "💔",
        "aching" => "🌙",
        "fierce" => "⚡",
        "still" => "🕯️",
        "electric" => "✨",
        "languid" => "🌊",
        "feral" => "🐺",
        "breath-held" => "🫁",
        _ => "💜",
    }
}

/// Visual rhythm for a pattern name; unknown patterns pulse once.
pub fn rhythm(pattern: &str) -> &'static str {
    match pattern {
        "double" => "• •",
        "triple" => "• • •",
        "cluster" => "•••",
        _ => "•",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    German,
}

impl Language {
    pub fn from_code(code: &str) -> Self {
        if code.trim().eq_ignore_ascii_case("de") {
            Language::German
        } else {
            Language::English
        }
    }

    fn header(&self) -> &'static str {
        match self {
            Language::English => "HEARTBEAT",
            Language::German => "HERZSCHLAG",
        }
    }

    fn closing(&self) -> &'static str {
        match self {
            Language::English => "My pulse, my choice.",
            Language::German => "Mein Puls, meine Wahl.",
        }
    }
}

/// Where a message goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    /// A user id; a DM channel is opened first.
    #[default]
    User,
    /// A channel id, posted to directly.
    Channel,
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetType::User => f.write_str("user"),
            TargetType::Channel => f.write_str("channel"),
        }
    }
}

fn default_pattern() -> String {
    "single".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HeartbeatRequest {
    pub temperature: String,
    #[serde(default)]
    pub whisper: Option<String>,
    #[serde(default = "default_pattern")]
    pub pattern: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub target_type: TargetType,
    #[serde(default = "default_true")]
    pub include_context: bool,
}

impl HeartbeatRequest {
    pub fn new(temperature: impl Into<String>) -> Self {
        Self {
            temperature: temperature.into(),
            whisper: None,
            pattern: default_pattern(),
            target: None,
            target_type: TargetType::User,
            include_context: true,
        }
    }
}

/// Spotify state at the time of the pulse.
#[derive(Debug, Clone, PartialEq)]
pub enum SpotifyStatus {
    Playing(NowPlaying),
    /// Not configured, unreachable, or nothing playing.
    Silent,
}

/// Ambient context rendered below the rhythm line.
#[derive(Debug, Clone, PartialEq)]
pub struct HeartbeatContext {
    pub local_time: DateTime<FixedOffset>,
    pub spotify: Option<SpotifyStatus>,
    pub weather: Option<Weather>,
}

/// Assemble the message text.
pub fn compose_message(
    request: &HeartbeatRequest,
    language: Language,
    context: Option<&HeartbeatContext>,
) -> String {
    let mut parts = vec![
        format!("[{}] {}", temperature_emoji(&request.temperature), language.header()),
        format!("temperature: {}", request.temperature),
        format!("rhythm: {}", rhythm(&request.pattern)),
    ];

    if let Some(context) = context {
        parts.push(format!(
            "\n{}",
            context.local_time.format("%A, %Y-%m-%d %H:%M:%S")
        ));
        match &context.spotify {
            Some(SpotifyStatus::Playing(playing)) => {
                parts.push(format!("\n🎵 Now Playing:\n{}", playing.render()));
            }
            Some(SpotifyStatus::Silent) => parts.push("\n🔇 Spotify ist still".to_string()),
            None => {}
        }
        if let Some(weather) = &context.weather {
            parts.push(format!("\n{}", weather.render()));
        }
    }

    if let Some(whisper) = request.whisper.as_deref().filter(|w| !w.is_empty()) {
        parts.push(format!("\n\n{whisper}"));
    }
    parts.push(format!("\n\n{}", language.closing()));

    parts.join("\n")
}

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Berlin;

/// Parse an IANA time zone name such as `Europe/Berlin`.
pub fn parse_timezone(name: &str) -> Option<Tz> {
    name.trim().parse().ok()
}

/// Wall-clock time of `instant` in `timezone`, daylight saving included.
pub fn local_time(timezone: Tz, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
    instant.with_timezone(&timezone).fixed_offset()
}

#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    pub discord: DiscordConfig,
    pub default_user_id: Option<String>,
    pub language: Language,
    pub timezone: Tz,
    pub spotify: Option<SpotifyConfig>,
    pub weather: Option<WeatherConfig>,
}

impl HeartbeatConfig {
    pub fn new(discord: DiscordConfig) -> Self {
        Self {
            discord,
            default_user_id: None,
            language: Language::English,
            timezone: DEFAULT_TIMEZONE,
            spotify: None,
            weather: None,
        }
    }

    pub fn from_env() -> ConfigResult<Self> {
        let timezone = match get_env_string("TIMEZONE") {
            Some(raw) => parse_timezone(&raw).ok_or_else(|| ConfigError::InvalidEnvVar {
                key: "TIMEZONE".to_string(),
                message: format!("unknown time zone '{raw}', expected e.g. Europe/Berlin"),
            })?,
            None => DEFAULT_TIMEZONE,
        };

        Ok(Self {
            discord: DiscordConfig::from_env()?,
            default_user_id: get_env_string("DEFAULT_USER_ID")
                .or_else(|| get_env_string("ALLOWED_DM_USER_ID")),
            language: get_env_string("BOT_LANGUAGE")
                .map(|code| Language::from_code(&code))
                .unwrap_or_default(),
            timezone,
            spotify: SpotifyConfig::from_env(),
            weather: WeatherConfig::from_env(),
        })
    }
}

/// The `send_heartbeat` tool.
pub struct HeartbeatTool {
    config: HeartbeatConfig,
    discord: DiscordClient,
    spotify: Option<SpotifyClient>,
    weather: Option<WeatherClient>,
}

impl HeartbeatTool {
    pub fn new(config: HeartbeatConfig) -> Self {
        Self {
            discord: DiscordClient::new(&config.discord),
            spotify: config.spotify.clone().map(SpotifyClient::new),
            weather: config.weather.clone().map(WeatherClient::new),
            config,
        }
    }

    fn now(&self) -> DateTime<FixedOffset> {
        local_time(self.config.timezone, Utc::now())
    }

    async fn gather_context(&self) -> HeartbeatContext {
        let spotify = match &self.spotify {
            Some(client) => match client.now_playing().await {
                Ok(Some(playing)) => SpotifyStatus::Playing(playing),
                Ok(None) => SpotifyStatus::Silent,
                Err(e) => {
                    debug!(error = %e, "Spotify context unavailable");
                    SpotifyStatus::Silent
                }
            },
            None => SpotifyStatus::Silent,
        };

        let weather = match &self.weather {
            Some(client) => client
                .current()
                .await
                .inspect_err(|e| debug!(error = %e, "Weather context unavailable"))
                .ok(),
            None => None,
        };

        HeartbeatContext {
            local_time: self.now(),
            spotify: Some(spotify),
            weather,
        }
    }

    /// Compose and deliver one heartbeat.
    pub async fn send(&self, request: HeartbeatRequest) -> ToolResponse {
        let (target, target_type) = match request.target.as_deref().filter(|t| !t.is_empty()) {
            Some(target) => (target.to_string(), request.target_type),
            None => match &self.config.default_user_id {
                Some(user) => (user.clone(), TargetType::User),
                None => {
                    return ToolResponse::error(
                        "No target given and no DEFAULT_USER_ID configured",
                    );
                }
            },
        };

        let context = if request.include_context {
            Some(self.gather_context().await)
        } else {
            None
        };
        let content = compose_message(&request, self.config.language, context.as_ref());

        let channel_id = match target_type {
            TargetType::User => match self.discord.open_dm(&target).await {
                Ok(id) => id,
                Err(e) => return ToolResponse::error(format!("Failed to create DM: {e}")),
            },
            TargetType::Channel => target.clone(),
        };

        match self.discord.create_message(&channel_id, &content).await {
            Ok(message) => {
                info!(temperature = %request.temperature, %target_type, "Heartbeat sent");
                ToolResponse::success(format!("Heartbeat sent to {target_type} {target}"))
                    .with_field("message_id", message.id)
                    .with_field("channel_id", channel_id)
            }
            Err(e) => ToolResponse::error(format!("Failed to send: {e}")),
        }
    }
}

#[async_trait]
impl Tool for HeartbeatTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Send a heartbeat pulse with an emotional temperature, rhythm and optional whisper"
    }

    fn input_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "temperature": {"type": "string"},
                "whisper": {"type": "string"},
                "pattern": {"type": "string", "enum": ["single", "double", "triple", "cluster"]},
                "target": {"type": "string"},
                "target_type": {"type": "string", "enum": ["user", "channel"]},
                "include_context": {"type": "boolean", "default": true}
            },
            "required": ["temperature"]
        }))
    }

    async fn call(&self, input: Value) -> ToolResponse {
        match parse_input::<HeartbeatRequest>(input) {
            Ok(request) => self.send(request).await,
            Err(response) => response,
        }
    }
}
