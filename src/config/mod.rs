//! Configuration management for comici-dl.
//!
//! Configuration is a flat TOML document read from
//! `~/.config/comici-dl/config.toml` (or a path given on the command line).
//! A missing file means defaults. Unknown keys are ignored.

pub mod cookies;

pub use cookies::{load_cookie_file, Cookie, CookieImport};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::fetcher::http_fetcher::{HttpSettings, DEFAULT_USER_AGENT};
use crate::site::SiteProtocol;

pub const DEFAULT_HOST: &str = "https://comic-growl.com";

/// Main configuration struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to a Cookie-Editor JSON export
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Any site running the Comici viewer
    pub host: String,

    /// Skip protocol detection and force one generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<SiteProtocol>,

    pub timeout_secs: u64,

    pub max_retries: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cookies: None,
            proxy: None,
            user_agent: None,
            host: DEFAULT_HOST.to_string(),
            protocol: None,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or the default path when `None`.
    ///
    /// A missing file yields defaults; an unreadable or invalid one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path()?,
        };

        if !config_path.exists() {
            tracing::debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;
        config.host = normalize_host(&config.host)?;

        Ok(config)
    }

    /// Write the configuration, creating parent directories as needed.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path()?,
        };

        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&config_path, content).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        Ok(config_path)
    }

    /// Delete the config file. Returns false when there was nothing to delete.
    pub fn reset(path: Option<&Path>) -> Result<bool, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path()?,
        };

        if !config_path.exists() {
            return Ok(false);
        }
        fs::remove_file(&config_path).map_err(|e| ConfigError::Io {
            path: config_path,
            source: e,
        })?;
        Ok(true)
    }

    /// Get the default config file path: `~/.config/comici-dl/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("comici-dl").join("config.toml"))
    }

    pub fn host_url(&self) -> Result<Url, ConfigError> {
        let host = normalize_host(&self.host)?;
        Url::parse(&host).map_err(|_| ConfigError::InvalidHost(self.host.clone()))
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            user_agent: self
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            proxy: self.proxy.clone(),
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
            max_retries: self.max_retries,
            ..HttpSettings::default()
        }
    }
}

/// Reduce any host spelling (`example.com`, `http://example.com/x`) to
/// `https://{hostname}`.
pub fn normalize_host(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    let url = Url::parse(&candidate).map_err(|_| ConfigError::InvalidHost(raw.to_string()))?;
    let hostname = url
        .host_str()
        .ok_or_else(|| ConfigError::InvalidHost(raw.to_string()))?;
    Ok(format!("https://{}", hostname))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid host: {0}")]
    InvalidHost(String),
}
