//! Spotify "now playing" lookup.
//!
//! Uses the refresh-token grant to obtain a short-lived access token, then
//! reads the current playback state.

use crate::error::{ToolsError, ToolsResult};
use ash_core::config::get_env_string;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_ACCOUNTS_BASE: &str = "https://accounts.spotify.com";
pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Spotify app credentials plus the user's refresh token.
#[derive(Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub accounts_base: String,
    pub api_base: String,
}

impl std::fmt::Debug for SpotifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyConfig")
            .field("client_id", &self.client_id)
            .field("accounts_base", &self.accounts_base)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl SpotifyConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            accounts_base: DEFAULT_ACCOUNTS_BASE.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_bases(mut self, accounts_base: impl Into<String>, api_base: impl Into<String>) -> Self {
        self.accounts_base = accounts_base.into();
        self.api_base = api_base.into();
        self
    }

    /// `None` unless `SPOTIFY_CLIENT_ID`, `SPOTIFY_CLIENT_SECRET` and
    /// `SPOTIFY_REFRESH_TOKEN` are all set.
    pub fn from_env() -> Option<Self> {
        Some(Self::new(
            get_env_string("SPOTIFY_CLIENT_ID")?,
            get_env_string("SPOTIFY_CLIENT_SECRET")?,
            get_env_string("SPOTIFY_REFRESH_TOKEN")?,
        ))
    }
}

/// The track currently playing.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub track: String,
    pub artists: Vec<String>,
    pub progress_ms: u64,
    pub duration_ms: u64,
}

impl NowPlaying {
    /// Three lines: track, artists, progress.
    pub fn render(&self) -> String {
        format!(
            "🎵 {}\n🎤 {}\n⏱️ {} / {}",
            self.track,
            self.artists.join(", "),
            mm_ss(self.progress_ms),
            mm_ss(self.duration_ms)
        )
    }
}

fn mm_ss(ms: u64) -> String {
    format!("{}:{:02}", ms / 60_000, (ms % 60_000) / 1000)
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct PlaybackState {
    #[serde(default)]
    progress_ms: Option<u64>,
    #[serde(default)]
    item: Option<Track>,
}

#[derive(Deserialize)]
struct Track {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    duration_ms: Option<u64>,
    #[serde(default)]
    artists: Vec<Artist>,
}

#[derive(Deserialize)]
struct Artist {
    name: String,
}

pub struct SpotifyClient {
    http: Client,
    config: SpotifyConfig,
}

impl SpotifyClient {
    pub fn new(config: SpotifyConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    /// The current track, or `None` when nothing is playing.
    pub async fn now_playing(&self) -> ToolsResult<Option<NowPlaying>> {
        let token = self.access_token().await?;

        let response = self
            .http
            .get(format!("{}/me/player/currently-playing", self.config.api_base))
            .bearer_auth(token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT => return Ok(None),
            StatusCode::OK => {}
            status => {
                return Err(ToolsError::Upstream {
                    service: "Spotify",
                    status: status.as_u16(),
                    detail: response.text().await.unwrap_or_default(),
                });
            }
        }

        let state: PlaybackState = response.json().await?;
        let Some(track) = state.item else {
            debug!("Spotify reports no current item");
            return Ok(None);
        };

        Ok(Some(NowPlaying {
            track: track.name.unwrap_or_else(|| "Unknown".to_string()),
            artists: track.artists.into_iter().map(|a| a.name).collect(),
            progress_ms: state.progress_ms.unwrap_or(0),
            duration_ms: track.duration_ms.unwrap_or(0),
        }))
    }

    async fn access_token(&self) -> ToolsResult<String> {
        let credentials = STANDARD.encode(format!(
            "{}:{}",
            self.config.client_id, self.config.client_secret
        ));
        let response = self
            .http
            .post(format!("{}/api/token", self.config.accounts_base))
            .header("Authorization", format!("Basic {credentials}"))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.config.refresh_token.as_str()),
            ])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(ToolsError::Upstream {
                service: "Spotify",
                status: response.status().as_u16(),
                detail: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response.json::<TokenResponse>().await?.access_token)
    }
}
