//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/roomsync/config.toml)
//! 3. Environment variables (ROOMSYNC_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::sync::{DEFAULT_MESSAGE_LIMIT, DEFAULT_ROOM};

/// Environment variable prefix
const ENV_PREFIX: &str = "ROOMSYNC";

/// Slack endpoint used for signup notifications
pub const DEFAULT_NOTIFY_ENDPOINT: &str = "https://slack.com/api/chat.postMessage";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Room joined at startup
    #[serde(default = "default_room")]
    pub default_room: String,

    /// Number of most recent messages kept per room
    #[serde(default = "default_message_limit")]
    pub message_limit: usize,

    /// Signup notification settings
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// Signup notification settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotifyConfig {
    /// chat.postMessage-compatible endpoint
    #[serde(default = "default_notify_endpoint")]
    pub endpoint: String,

    /// Channel to post to
    #[serde(default)]
    pub channel: Option<String>,

    /// Bot token sent as a bearer token
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_room: default_room(),
            message_limit: default_message_limit(),
            notify: NotifyConfig::default(),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            endpoint: default_notify_endpoint(),
            channel: None,
            token: None,
        }
    }
}

impl NotifyConfig {
    /// Whether enough is set to send notifications
    pub fn is_configured(&self) -> bool {
        self.channel.is_some() && self.token.is_some()
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (ROOMSYNC_DEFAULT_ROOM, ROOMSYNC_MESSAGE_LIMIT, ROOMSYNC_NOTIFY_*)
    /// 2. Config file (~/.config/roomsync/config.toml or ROOMSYNC_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject values the synchronizer cannot work with
    fn validate(&self) -> Result<()> {
        if self.message_limit == 0 {
            bail!("message_limit must be greater than 0");
        }
        let room = self.default_room.trim();
        if room.is_empty() || room.contains('/') {
            bail!("Invalid default_room: '{}'", self.default_room);
        }
        Ok(())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // ROOMSYNC_DEFAULT_ROOM
        if let Ok(val) = std::env::var(format!("{}_DEFAULT_ROOM", ENV_PREFIX)) {
            if !val.trim().is_empty() {
                self.default_room = val.trim().to_string();
            }
        }

        // ROOMSYNC_MESSAGE_LIMIT
        if let Ok(val) = std::env::var(format!("{}_MESSAGE_LIMIT", ENV_PREFIX)) {
            match val.parse::<usize>() {
                Ok(limit) if limit > 0 => self.message_limit = limit,
                _ => {}
            }
        }

        // ROOMSYNC_NOTIFY_ENDPOINT
        if let Ok(val) = std::env::var(format!("{}_NOTIFY_ENDPOINT", ENV_PREFIX)) {
            if !val.is_empty() {
                self.notify.endpoint = val;
            }
        }

        // ROOMSYNC_NOTIFY_CHANNEL
        if let Ok(val) = std::env::var(format!("{}_NOTIFY_CHANNEL", ENV_PREFIX)) {
            self.notify.channel = if val.is_empty() { None } else { Some(val) };
        }

        // ROOMSYNC_NOTIFY_TOKEN
        if let Ok(val) = std::env::var(format!("{}_NOTIFY_TOKEN", ENV_PREFIX)) {
            self.notify.token = if val.is_empty() { None } else { Some(val) };
        }
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with ROOMSYNC_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("roomsync")
            .join("config.toml")
    }
}

fn default_room() -> String {
    DEFAULT_ROOM.to_string()
}

fn default_message_limit() -> usize {
    DEFAULT_MESSAGE_LIMIT
}

fn default_notify_endpoint() -> String {
    DEFAULT_NOTIFY_ENDPOINT.to_string()
}
