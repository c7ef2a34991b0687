use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::logging;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Shared secret expected in the `X-API-Key` header
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Reported by `/health`
    #[serde(default = "default_application_name")]
    pub application_name: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            bind_address: default_bind_address(),
            application_name: default_application_name(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_api_key() -> String {
    "api-key".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_application_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load settings from an optional TOML file, then the process environment.
    ///
    /// With no explicit path, `config.toml` is read if present and silently
    /// skipped otherwise. An explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => None,
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))
            }
        };

        Self::from_sources(content.as_deref(), |key| std::env::var(key).ok())
            .with_context(|| format!("Invalid configuration (file: {})", path.display()))
    }

    /// Build and validate a config from TOML text and an environment lookup.
    /// Environment values win over file values; empty values are ignored.
    pub fn from_sources<F>(toml_content: Option<&str>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Config = match toml_content {
            Some(content) => toml::from_str(content).context("Failed to parse config file")?,
            None => Config::default(),
        };

        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = lookup("API_KEY") {
            config.api.api_key = v;
        }
        if let Some(v) = lookup("BIND_ADDRESS") {
            config.api.bind_address = v;
        }
        if let Some(v) = lookup("APP_NAME") {
            config.api.application_name = v;
        }
        if let Some(v) = lookup("TELEGRAM_TOKEN").or_else(|| lookup("BOTFATHER_TOKEN")) {
            config.telegram.bot_token = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.logging.level = v;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            anyhow::bail!("telegram.bot_token is required (set TELEGRAM_TOKEN)");
        }
        if self.api.api_key.is_empty() {
            anyhow::bail!("api.api_key must not be empty (set API_KEY)");
        }
        if logging::parse_level(&self.logging.level).is_none() {
            anyhow::bail!(
                "logging.level '{}' is not one of trace, debug, info, warn, error",
                self.logging.level
            );
        }
        self.socket_addr()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.api
            .bind_address
            .parse()
            .with_context(|| {
                format!(
                    "api.bind_address '{}' is not a valid socket address",
                    self.api.bind_address
                )
            })
    }
}
