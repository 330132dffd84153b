//! # Environment-Based Configuration
//!
//! Every tool reads its settings from environment variables. This module
//! holds the typed lookup helpers shared by all crates plus the Discord
//! connection settings most tools need.
//!
//! ## Environment Variables
//!
//! - `DISCORD_BOT_TOKEN` - Bot token used for every Discord REST call (required)
//! - `DISCORD_API_BASE` - REST base URL (default: `https://discord.com/api/v10`)
//!
//! Empty values count as unset.

use std::env;
use std::str::FromStr;

pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Placeholder shipped in sample `.env` files.
const TOKEN_PLACEHOLDER: &str = "YOUR_DISCORD_BOT_TOKEN_HERE";

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("Missing required environment variable '{0}'")]
    MissingEnvVar(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Read a variable, treating empty strings as unset.
pub fn get_env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Read a variable that must be present.
pub fn require_env(key: &str) -> ConfigResult<String> {
    get_env_string(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

pub fn get_env_bool(key: &str) -> ConfigResult<Option<bool>> {
    match get_env_string(key) {
        Some(val) => parse_bool(&val).map(Some).ok_or_else(|| ConfigError::InvalidEnvVar {
            key: key.to_string(),
            message: format!("invalid boolean value '{val}', expected true/false/1/0/yes/no/on/off"),
        }),
        None => Ok(None),
    }
}

pub fn get_env_u64(key: &str) -> ConfigResult<Option<u64>> {
    get_env_parsed(key, "u64")
}

pub fn get_env_usize(key: &str) -> ConfigResult<Option<usize>> {
    get_env_parsed(key, "usize")
}

pub fn get_env_f64(key: &str) -> ConfigResult<Option<f64>> {
    get_env_parsed(key, "f64")
}

fn get_env_parsed<T>(key: &str, type_name: &str) -> ConfigResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_string(key) {
        Some(val) => val
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid {type_name} value '{val}': {e}"),
            }),
        None => Ok(None),
    }
}

/// Parse the boolean spellings accepted across the workspace.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Discord bot connection settings.
#[derive(Clone)]
pub struct DiscordConfig {
    pub bot_token: String,
    pub api_base: String,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("bot_token", &"<redacted>")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl DiscordConfig {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            api_base: DEFAULT_DISCORD_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the bot token is missing or still the
    /// sample placeholder.
    pub fn from_env() -> ConfigResult<Self> {
        let token = require_env("DISCORD_BOT_TOKEN")?;
        let mut config = Self::new(token);
        if let Some(base) = get_env_string("DISCORD_API_BASE") {
            config = config.with_api_base(base);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.bot_token.trim().is_empty() || self.bot_token == TOKEN_PLACEHOLDER {
            return Err(ConfigError::ValidationError(
                "Discord bot token not configured".to_string(),
            ));
        }
        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "Discord API base must be an http(s) URL, got '{}'",
                self.api_base
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn set_env(key: &str, value: &str) {
        unsafe {
            env::set_var(key, value);
        }
    }

    fn clear_env(key: &str) {
        unsafe {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_parse_bool_spellings() {
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    #[serial]
    fn test_empty_value_counts_as_unset() {
        set_env("ASH_TEST_EMPTY", "  ");
        assert_eq!(get_env_string("ASH_TEST_EMPTY"), None);
        assert!(matches!(
            require_env("ASH_TEST_EMPTY"),
            Err(ConfigError::MissingEnvVar(_))
        ));
        clear_env("ASH_TEST_EMPTY");
    }

    #[test]
    #[serial]
    fn test_invalid_number_is_reported_with_key() {
        set_env("ASH_TEST_NUMBER", "sixty");
        let err = get_env_u64("ASH_TEST_NUMBER").unwrap_err();
        assert!(err.to_string().contains("ASH_TEST_NUMBER"));
        clear_env("ASH_TEST_NUMBER");
    }

    #[test]
    #[serial]
    fn test_discord_config_from_env() {
        set_env("DISCORD_BOT_TOKEN", "abc");
        set_env("DISCORD_API_BASE", "http://localhost:9999/api");
        let config = DiscordConfig::from_env().expect("should load config");
        assert_eq!(config.bot_token, "abc");
        assert_eq!(config.api_base, "http://localhost:9999/api");
        assert!(!format!("{config:?}").contains("abc"));
        clear_env("DISCORD_BOT_TOKEN");
        clear_env("DISCORD_API_BASE");
    }

    #[test]
    #[serial]
    fn test_discord_config_rejects_placeholder() {
        set_env("DISCORD_BOT_TOKEN", TOKEN_PLACEHOLDER);
        assert!(matches!(
            DiscordConfig::from_env(),
            Err(ConfigError::ValidationError(_))
        ));
        clear_env("DISCORD_BOT_TOKEN");
    }
}
