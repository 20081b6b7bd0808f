//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/ticked/config.toml)
//! 3. Environment variables (TICKED_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable prefix
const ENV_PREFIX: &str = "TICKED";

/// Errors that make the configuration unusable at startup
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The sync backend refuses to start without a license key
    #[error(
        "license key is not configured. Set license_key in the config file \
         or the TICKED_LICENSE_KEY environment variable."
    )]
    MissingLicenseKey,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for data storage (replica files, session token)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Base URL of the account API (sign-in, sign-up)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Push endpoint override (defaults to `<api_url>/api/replicache/push`)
    #[serde(default)]
    pub push_url: Option<String>,

    /// Pull endpoint override (defaults to `<api_url>/api/replicache/pull`)
    #[serde(default)]
    pub pull_url: Option<String>,

    /// License key for the sync engine (required to open a store)
    #[serde(default)]
    pub license_key: Option<String>,

    /// Background reconciliation cadence in seconds
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,

    /// Default log filter for engine diagnostics
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            api_url: default_api_url(),
            push_url: None,
            pull_url: None,
            license_key: None,
            sync_interval_secs: default_sync_interval(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (TICKED_DATA_DIR, TICKED_API_URL, ...)
    /// 2. Config file (~/.config/ticked/config.toml or TICKED_CONFIG)
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
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_API_URL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.api_url = val;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_PUSH_URL", ENV_PREFIX)) {
            self.push_url = if val.is_empty() { None } else { Some(val) };
        }

        if let Ok(val) = std::env::var(format!("{}_PULL_URL", ENV_PREFIX)) {
            self.pull_url = if val.is_empty() { None } else { Some(val) };
        }

        if let Ok(val) = std::env::var(format!("{}_LICENSE_KEY", ENV_PREFIX)) {
            self.license_key = if val.is_empty() { None } else { Some(val) };
        }

        if let Ok(val) = std::env::var(format!("{}_SYNC_INTERVAL", ENV_PREFIX)) {
            if let Ok(secs) = val.parse() {
                self.sync_interval_secs = secs;
            }
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_file_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with TICKED_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ticked")
            .join("config.toml")
    }

    /// The license key, or the fatal configuration error if it is absent
    pub fn require_license_key(&self) -> Result<&str, ConfigError> {
        self.license_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingLicenseKey)
    }

    /// Effective push endpoint URL
    pub fn push_url(&self) -> String {
        self.push_url
            .clone()
            .unwrap_or_else(|| format!("{}/api/replicache/push", self.api_url.trim_end_matches('/')))
    }

    /// Effective pull endpoint URL
    pub fn pull_url(&self) -> String {
        self.pull_url
            .clone()
            .unwrap_or_else(|| format!("{}/api/replicache/pull", self.api_url.trim_end_matches('/')))
    }

    /// Get the path to the session token file
    pub fn token_path(&self) -> PathBuf {
        self.data_dir.join("token")
    }

    /// Get the path to a named replica file
    pub fn replica_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("replica-{name}.json"))
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ticked")
}

fn default_api_url() -> String {
    "https://todo-api-ixpx.onrender.com".to_string()
}

fn default_sync_interval() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}
