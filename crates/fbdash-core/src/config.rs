//! Configuration management for FBDASH.
//!
//! Loads configuration from ${FBDASH_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default base URL of the feedback API.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";

pub mod paths {
    //! Path resolution for FBDASH configuration and data directories.
    //!
    //! FBDASH_HOME resolution order:
    //! 1. FBDASH_HOME environment variable (if set)
    //! 2. ~/.config/fbdash (default)

    use std::path::PathBuf;

    /// Returns the FBDASH home directory.
    ///
    /// Checks FBDASH_HOME env var first, falls back to ~/.config/fbdash
    pub fn fbdash_home() -> PathBuf {
        if let Ok(home) = std::env::var("FBDASH_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("fbdash"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        fbdash_home().join("config.toml")
    }

    /// Returns the path to the credential file.
    pub fn auth_path() -> PathBuf {
        fbdash_home().join("auth.json")
    }
}

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the feedback API (no trailing slash).
    pub api_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if the file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Returns the effective API base URL.
    ///
    /// FBDASH_BASE_URL env var takes precedence over the config file,
    /// which lets tests point the client at a mock server.
    pub fn base_url(&self) -> String {
        if let Ok(url) = std::env::var("FBDASH_BASE_URL") {
            let trimmed = url.trim_end_matches('/');
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
        self.api_base_url.trim_end_matches('/').to_string()
    }

    /// Writes a fresh default config file if none exists.
    ///
    /// Returns true if a file was created.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn init_at(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        fs::write(path, default_config_template())
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(true)
    }
}

/// Default config.toml contents.
fn default_config_template() -> String {
    format!("# FBDASH configuration\n\n# Base URL of the feedback API\napi_base_url = \"{DEFAULT_BASE_URL}\"\n")
}
