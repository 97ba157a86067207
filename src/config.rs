//! Configuration loader and validator for the GitHub activity bot.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::scheduler::PollSettings;

pub const DEFAULT_API_BASE: &str = "https://api.github.com/";

const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub app: App,
    pub telegram: Telegram,
    pub github: Github,
}

/// Polling cadence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct App {
    pub poll_interval_seconds: u64,
    pub first_poll_delay_seconds: u64,
}

impl Default for App {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 120,
            first_poll_delay_seconds: 5,
        }
    }
}

/// Telegram bot settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Telegram {
    pub bot_token: String,
}

/// GitHub API settings. A missing token means unauthenticated calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Github {
    pub token: Option<String>,
    pub api_base: String,
}

impl Default for Github {
    fn default() -> Self {
        Self {
            token: None,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl Config {
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            first_delay: Duration::from_secs(self.app.first_poll_delay_seconds),
            interval: Duration::from_secs(self.app.poll_interval_seconds),
        }
    }

    /// Override secrets from environment lookups; blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(ENV_BOT_TOKEN).filter(|t| !t.trim().is_empty()) {
            self.telegram.bot_token = token;
        }
        if let Some(token) = lookup(ENV_GITHUB_TOKEN).filter(|t| !t.trim().is_empty()) {
            self.github.token = Some(token);
        }
    }

    /// The GitHub token, treating a blank string as absent.
    pub fn github_token(&self) -> Option<&str> {
        self.github
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Load configuration, apply environment overrides and validate.
/// - If `path` is None, defaults are used and only the environment supplies secrets.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut cfg = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            serde_yaml::from_str(&content)?
        }
        None => Config::default(),
    };
    cfg.apply_env(|key| std::env::var(key).ok());
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.poll_interval_seconds == 0 {
        return Err(ConfigError::Invalid("app.poll_interval_seconds must be > 0"));
    }
    if cfg.telegram.bot_token.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "telegram.bot_token must be non-empty (or set TELEGRAM_BOT_TOKEN)",
        ));
    }
    if Url::parse(&cfg.github.api_base).is_err() {
        return Err(ConfigError::Invalid("github.api_base must be a valid URL"));
    }
    Ok(())
}

/// Example YAML content.
pub fn example() -> &'static str {
    r#"app:
  poll_interval_seconds: 120
  first_poll_delay_seconds: 5

telegram:
  bot_token: "YOUR_TELEGRAM_BOT_TOKEN"

github:
  token: "YOUR_GITHUB_TOKEN"
  api_base: "https://api.github.com/"
"#
}
