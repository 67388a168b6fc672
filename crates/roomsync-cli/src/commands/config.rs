//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use roomsync_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: &PathBuf, output: &Output) -> Result<()> {
    let config = Config::load_from_path(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "default_room": config.default_room,
                    "message_limit": config.message_limit,
                    "notify": {
                        "endpoint": config.notify.endpoint,
                        "channel": config.notify.channel,
                        "token_set": config.notify.token.is_some()
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config_path.display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  default_room:    {}", config.default_room);
            println!("  message_limit:   {}", config.message_limit);
            println!("  notify.endpoint: {}", config.notify.endpoint);
            println!(
                "  notify.channel:  {}",
                config.notify.channel.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  notify.token:    {}",
                if config.notify.token.is_some() {
                    "(set)"
                } else {
                    "(not set)"
                }
            );
            println!();
            println!("Config file: {}", config_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String, config_path: &PathBuf, output: &Output) -> Result<()> {
    let mut config = Config::load_from_path(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    config
        .save_to_path(config_path)
        .context("Failed to save configuration")?;

    let shown = if key == "notify.token" { "***" } else { value.as_str() };
    output.success(&format!("Set {} = {}", key, shown));

    Ok(())
}

/// Apply one `key = value` assignment to a config
fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "default_room" => {
            let room = value.trim();
            if room.is_empty() || room.contains('/') {
                bail!("Invalid room id: '{}'", value);
            }
            config.default_room = room.to_string();
        }
        "message_limit" => {
            let limit: usize = value
                .parse()
                .context("Invalid value for message_limit. Use a positive number.")?;
            if limit == 0 {
                bail!("message_limit must be greater than 0");
            }
            config.message_limit = limit;
        }
        "notify.endpoint" => {
            if value.is_empty() {
                bail!("notify.endpoint cannot be empty");
            }
            config.notify.endpoint = value.to_string();
        }
        "notify.channel" => {
            config.notify.channel = optional(value);
        }
        "notify.token" => {
            config.notify.token = optional(value);
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: default_room, message_limit, notify.endpoint, notify.channel, notify.token",
                key
            );
        }
    }

    Ok(())
}

/// Empty or "none" clears an optional value
fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::default();

        apply(&mut config, "default_room", "lobby").unwrap();
        apply(&mut config, "message_limit", "25").unwrap();
        apply(&mut config, "notify.channel", "C1").unwrap();
        apply(&mut config, "notify.token", "xoxb").unwrap();

        assert_eq!(config.default_room, "lobby");
        assert_eq!(config.message_limit, 25);
        assert!(config.notify.is_configured());

        apply(&mut config, "notify.token", "none").unwrap();
        assert!(config.notify.token.is_none());
    }

    #[test]
    fn test_apply_rejects_bad_values() {
        let mut config = Config::default();

        assert!(apply(&mut config, "message_limit", "0").is_err());
        assert!(apply(&mut config, "message_limit", "many").is_err());
        assert!(apply(&mut config, "default_room", "a/b").is_err());
        assert!(apply(&mut config, "data_dir", "/tmp").is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_set_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let output = Output::new(OutputFormat::Quiet);

        set("default_room".into(), "ops".into(), &path, &output).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let saved: Config = toml::from_str(&content).unwrap();
        assert_eq!(saved.default_room, "ops");
    }
}
