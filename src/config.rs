use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::duration::deserialize_duration_opt;

const CONFIG_FILE_NAME: &str = "statement-mailer.toml";

fn default_base_url() -> String {
    "https://www.qander.nl".to_string()
}

fn default_user_agent() -> String {
    concat!("statement-mailer/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_from() -> String {
    "Qander Automailer <nobody@polyware.nl>".to_string()
}

fn default_subject() -> String {
    "Uw rekeningoverzicht van Qander".to_string()
}

fn default_body() -> String {
    "Attached you will find the statements".to_string()
}

/// Where and how to reach the statement portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Site origin every portal path is resolved against.
    pub base_url: String,

    pub user_agent: String,

    /// Per-request timeout. When unset the HTTP client's own defaults apply.
    #[serde(
        default,
        deserialize_with = "deserialize_duration_opt",
        skip_serializing
    )]
    pub request_timeout: Option<Duration>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            request_timeout: None,
        }
    }
}

/// Fixed parts of the outgoing statement mail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub from: String,
    pub subject: String,
    pub body: String,

    /// SMTP command timeout. When unset the mail transport's default applies.
    #[serde(
        default,
        deserialize_with = "deserialize_duration_opt",
        skip_serializing
    )]
    pub timeout: Option<Duration>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: default_from(),
            subject: default_subject(),
            body: default_body(),
            timeout: None,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub portal: PortalConfig,
    pub mail: MailConfig,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./statement-mailer.toml` if it exists in current directory
/// 2. `~/.config/statement-mailer/statement-mailer.toml`
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from(CONFIG_FILE_NAME);
    if local_config.exists() {
        return local_config;
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("statement-mailer").join(CONFIG_FILE_NAME);
    }

    local_config
}
