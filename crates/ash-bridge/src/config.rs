//! # Bridge Configuration
//!
//! ## Environment Variables
//!
//! - `DISCORD_BOT_TOKEN` / `DISCORD_API_BASE` - see [`ash_core::config`]
//! - `MCP_COMMAND_CHANNEL_ID` - Channel the robot relay bot listens on (required)
//! - `MCP_COMMAND_TIMEOUT` - Seconds to wait for a reply (default: 60)
//! - `MCP_POLL_INTERVAL_MS` - Delay between channel polls in ms (default: 1500)
//! - `MCP_POLL_PAGE_SIZE` - Frames fetched per poll, 1-100 (default: 10)

use ash_core::config::{
    ConfigError, ConfigResult, DiscordConfig, get_env_u64, get_env_usize, require_env,
};
use std::time::Duration;

/// Timing of the command/reply exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationConfig {
    /// How long to wait for a reply after the command frame was sent
    pub command_timeout: Duration,
    /// Pause before each poll of the channel
    pub poll_interval: Duration,
    /// Maximum frames fetched per poll
    pub page_size: usize,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(1500),
            page_size: 10,
        }
    }
}

impl CorrelationConfig {
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Load overrides from environment variables on top of the defaults.
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = Self::default();
        if let Some(secs) = get_env_u64("MCP_COMMAND_TIMEOUT")? {
            config.command_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = get_env_u64("MCP_POLL_INTERVAL_MS")? {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(size) = get_env_usize("MCP_POLL_PAGE_SIZE")? {
            config.page_size = size;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.command_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "command timeout must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if !(1..=100).contains(&self.page_size) {
            return Err(ConfigError::ValidationError(format!(
                "poll page size must be between 1 and 100, got {}",
                self.page_size
            )));
        }
        Ok(())
    }
}

/// Everything needed to drive the robot through Discord.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub discord: DiscordConfig,
    pub command_channel_id: String,
    pub correlation: CorrelationConfig,
}

impl BridgeConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or any value
    /// is invalid.
    pub fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            discord: DiscordConfig::from_env()?,
            command_channel_id: require_env("MCP_COMMAND_CHANNEL_ID")?,
            correlation: CorrelationConfig::from_env()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

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

    fn clear_all_bridge_env_vars() {
        for key in [
            "DISCORD_BOT_TOKEN",
            "DISCORD_API_BASE",
            "MCP_COMMAND_CHANNEL_ID",
            "MCP_COMMAND_TIMEOUT",
            "MCP_POLL_INTERVAL_MS",
            "MCP_POLL_PAGE_SIZE",
        ] {
            clear_env(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_when_no_overrides_set() {
        clear_all_bridge_env_vars();
        let config = CorrelationConfig::from_env().expect("should load defaults");
        assert_eq!(config, CorrelationConfig::default());
        assert_eq!(config.command_timeout, Duration::from_secs(60));
        assert_eq!(config.poll_interval, Duration::from_millis(1500));
        assert_eq!(config.page_size, 10);
    }

    #[test]
    #[serial]
    fn test_timeout_override() {
        clear_all_bridge_env_vars();
        set_env("MCP_COMMAND_TIMEOUT", "90");
        let config = CorrelationConfig::from_env().expect("should load config");
        assert_eq!(config.command_timeout, Duration::from_secs(90));
        clear_all_bridge_env_vars();
    }

    #[test]
    #[serial]
    fn test_invalid_page_size_rejected() {
        clear_all_bridge_env_vars();
        set_env("MCP_POLL_PAGE_SIZE", "500");
        assert!(matches!(
            CorrelationConfig::from_env(),
            Err(ConfigError::ValidationError(_))
        ));
        clear_all_bridge_env_vars();
    }

    #[test]
    #[serial]
    fn test_bridge_config_requires_channel() {
        clear_all_bridge_env_vars();
        set_env("DISCORD_BOT_TOKEN", "token");
        assert!(matches!(
            BridgeConfig::from_env(),
            Err(ConfigError::MissingEnvVar(key)) if key == "MCP_COMMAND_CHANNEL_ID"
        ));

        set_env("MCP_COMMAND_CHANNEL_ID", "123");
        let config = BridgeConfig::from_env().expect("should load config");
        assert_eq!(config.command_channel_id, "123");
        clear_all_bridge_env_vars();
    }
}
