//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::auth::AuthConfig;
use super::countries::{CountryCacheConfig, CountryTable};
use super::limits::LimitsConfig;
use super::listen::ListenConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Daemon configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server identity and observability.
    pub server: ServerConfig,
    /// WebSocket listener.
    pub listen: ListenConfig,
    /// Database configuration.
    pub database: Option<DatabaseConfig>,
    /// Mailbox, queue and rate limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Credential table for the auth collaborator.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Pricing tables, one per country.
    #[serde(default)]
    pub countries: Vec<CountryTable>,
    /// Country table cache behaviour.
    #[serde(default)]
    pub country_cache: CountryCacheConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Database path, defaulting to `bidstage.db` next to the working directory.
    pub fn database_path(&self) -> &str {
        self.database
            .as_ref()
            .map(|d| d.path.as_str())
            .unwrap_or("bidstage.db")
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name, used in logs.
    pub name: String,
    /// Prometheus metrics HTTP port (0 disables the endpoint).
    pub metrics_port: Option<u16>,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

/// Log output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file, or `:memory:`.
    pub path: String,
}
