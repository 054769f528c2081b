// Configuration loading.
// Reads an optional TOML file from the platform config directory; every field has a default.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::blame::heat::DEFAULT_PALETTE;
use crate::error::{BlameError, Result};

const APP_NAME: &str = "remote-blame";

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub heat: HeatConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// GitHub endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// REST API base URL.
    pub api_url: String,
    /// GraphQL endpoint.
    pub graphql_url: String,
    /// Web host used for issue links in hover text.
    pub web_url: String,
    /// Per-request timeout. Unset means no timeout.
    pub request_timeout_secs: Option<u64>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            graphql_url: "https://api.github.com/graphql".to_string(),
            web_url: "https://github.com".to_string(),
            request_timeout_secs: None,
        }
    }
}

impl GitHubConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Heat-map palette, newest age first. Its length is the bucket count.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeatConfig {
    pub palette: Vec<String>,
}

impl Default for HeatConfig {
    fn default() -> Self {
        Self {
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, overridden by RUST_LOG.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from an explicit path, or from the default location when it exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::load_from(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Load and validate a config file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.heat.palette.is_empty() {
            return Err(BlameError::Config(
                "heat.palette must name at least one color".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default config file location (~/.config/remote-blame/config.toml on Linux).
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Directory for log files.
pub fn log_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|dirs| {
        dirs.state_dir()
            .unwrap_or_else(|| dirs.cache_dir())
            .to_path_buf()
    })
}
